//! Error types for the typed accessors.

use thiserror::Error;

use crate::nvs::StoreError;

/// Errors returned by [`Memory`](super::Memory) operations.
///
/// Failures reported by the store are carried unchanged in
/// [`MemoryError::Store`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Memory not initialized: call init() first")]
    InvalidState,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of memory: cannot allocate {size} bytes for key '{key}'")]
    NoMemory { key: String, size: usize },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Stored string for key '{0}' is not valid UTF-8")]
    InvalidUtf8(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MemoryError {
    /// Returns `true` if the façade was used while closed.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState)
    }

    /// Returns `true` if the store reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// Returns `true` if the operation is not supported for the value type.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    /// The underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}
