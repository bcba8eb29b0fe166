//! Unified error type for the nvs-kv library.
//!
//! This module provides a single [`Error`] type covering every error the
//! library and its command-line front end can produce.

use thiserror::Error;

#[cfg(feature = "cli")]
use crate::cli::{ConfigError, LoggingError};
use crate::memory::MemoryError;
use crate::nvs::StoreError;

/// Unified error type for all nvs-kv operations.
///
/// # Example
///
/// ```
/// use nvs_kv::memory::Memory;
/// use nvs_kv::nvs::MemoryNvs;
///
/// fn boot_count(memory: &mut Memory<MemoryNvs>) -> nvs_kv::Result<i32> {
///     let boots = match memory.get_i32("boots") {
///         Ok(n) => n + 1,
///         Err(e) if e.is_not_found() => 1,
///         Err(e) => return Err(e.into()),
///     };
///     memory.set_i32("boots", boots)?;
///     Ok(boots)
/// }
///
/// let mut memory = Memory::new(MemoryNvs::new());
/// memory.init().unwrap();
/// assert_eq!(boot_count(&mut memory).unwrap(), 1);
/// assert_eq!(boot_count(&mut memory).unwrap(), 2);
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the typed accessors.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Error reported directly by a backend.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Error loading the configuration file.
    #[cfg(feature = "cli")]
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error installing the log subscriber.
    #[cfg(feature = "cli")]
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed command-line input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid input error from a string message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Returns `true` if this is an accessor error.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    /// Returns `true` if this is a backend error, whether reported directly or
    /// passed through the accessors.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Memory(MemoryError::Store(_)))
    }

    /// Returns `true` if the requested key does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Memory(e) => e.is_not_found(),
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` if this is a configuration error.
    #[cfg(feature = "cli")]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is an I/O error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
