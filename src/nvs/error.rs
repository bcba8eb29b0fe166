//! Error codes reported by NVS backends.

use thiserror::Error;

/// Errors that an NVS backend can report.
///
/// These mirror the store's own error domain and are surfaced to callers of
/// the typed accessors without translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key too long: '{key}' is {len} bytes, limit is {max}")]
    KeyTooLong { key: String, len: usize, max: usize },

    #[error("Value too long for key '{key}': {len} bytes, limit is {max}")]
    ValueTooLong { key: String, len: usize, max: usize },

    #[error("No free pages left in the NVS partition")]
    NoFreePages,

    #[error("NVS partition contains data in a newer format (found version {found}, expected {expected})")]
    NewVersionFound { found: u32, expected: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid namespace or key name: '{0}'")]
    InvalidName(String),

    #[error("Invalid namespace handle: {0}")]
    InvalidHandle(u32),

    #[error("Buffer too small for key '{key}': need {needed} bytes, have {available}")]
    InvalidLength {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Namespace was opened read-only")]
    ReadOnly,

    #[error("Type mismatch for key '{key}': stored {stored}, requested {requested}")]
    TypeMismatch {
        key: String,
        stored: &'static str,
        requested: &'static str,
    },

    #[error("NVS partition not initialized")]
    NotInitialized,

    #[error("Corrupted entry for key '{0}'")]
    Corrupted(String),

    #[error("Flash error: {0}")]
    Flash(String),
}

impl StoreError {
    /// Create a flash error from any displayable message.
    pub fn flash(msg: impl Into<String>) -> Self {
        Self::Flash(msg.into())
    }

    /// Returns `true` if the key does not exist in the namespace.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for the conditions that `init` recovers from by erasing
    /// the partition and initializing again.
    pub fn needs_erase(&self) -> bool {
        matches!(self, Self::NoFreePages | Self::NewVersionFound { .. })
    }
}

#[cfg(feature = "fjall")]
impl From<fjall::Error> for StoreError {
    fn from(e: fjall::Error) -> Self {
        Self::Flash(e.to_string())
    }
}
