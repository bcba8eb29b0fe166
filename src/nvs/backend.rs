//! The store contract the typed accessors are written against.

use std::fmt;
use std::num::NonZeroU32;

use super::error::StoreError;

/// Maximum length of a key or namespace name, in bytes.
pub const MAX_KEY_LEN: usize = 15;

/// Maximum size of a stored string, including its terminator.
pub const MAX_STR_LEN: usize = 4000;

/// Maximum size of a stored blob.
pub const MAX_BLOB_LEN: usize = 508_000;

/// Handle to an open namespace.
///
/// Handles are never zero, so an absent handle is expressed as
/// `Option<NamespaceHandle>` rather than a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceHandle(NonZeroU32);

impl NamespaceHandle {
    /// Wrap a raw handle value. Returns `None` for zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw handle value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for NamespaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access mode requested when opening a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only. Opening a namespace that does not exist fails.
    ReadOnly,
    /// Reads and writes. The namespace is created if missing.
    ReadWrite,
}

/// Type of an entry as recorded by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    I32,
    Str,
    Blob,
}

impl EntryKind {
    /// On-flash tag byte.
    pub const fn tag(self) -> u8 {
        match self {
            Self::I32 => 0x14,
            Self::Str => 0x21,
            Self::Blob => 0x42,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x14 => Some(Self::I32),
            0x21 => Some(Self::Str),
            0x42 => Some(Self::Blob),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::Str => "string",
            Self::Blob => "blob",
        }
    }
}

/// A namespace-scoped persistent key-value store on flash.
///
/// Sized reads follow the two-call protocol of the underlying engine: passing
/// `None` as the buffer only reports the stored size, passing a buffer copies
/// the value into it. String sizes include the trailing NUL.
pub trait NvsBackend {
    /// Prepare the partition for use.
    fn flash_init(&mut self) -> Result<(), StoreError>;

    /// Erase every namespace in the partition. Open handles become invalid
    /// and the partition must be initialized again.
    fn erase_all(&mut self) -> Result<(), StoreError>;

    /// Open a namespace by name.
    fn open(&mut self, namespace: &str, mode: OpenMode) -> Result<NamespaceHandle, StoreError>;

    /// Close a handle. Unknown handles are ignored.
    fn close(&mut self, handle: NamespaceHandle);

    fn get_i32(&self, handle: NamespaceHandle, key: &str) -> Result<i32, StoreError>;

    /// Read a string. Returns the size including the terminator.
    fn get_str(
        &self,
        handle: NamespaceHandle,
        key: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError>;

    /// Read a blob. Returns its size in bytes.
    fn get_blob(
        &self,
        handle: NamespaceHandle,
        key: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError>;

    fn set_i32(&mut self, handle: NamespaceHandle, key: &str, value: i32) -> Result<(), StoreError>;

    fn set_str(&mut self, handle: NamespaceHandle, key: &str, value: &str)
    -> Result<(), StoreError>;

    fn set_blob(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: &[u8],
    ) -> Result<(), StoreError>;

    /// Make all writes made through `handle` durable.
    fn commit(&mut self, handle: NamespaceHandle) -> Result<(), StoreError>;
}

/// Validate a namespace name against the store's naming rules.
pub fn check_namespace(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > MAX_KEY_LEN || name.contains('\0') {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validate a key against the store's naming rules.
pub fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('\0') {
        return Err(StoreError::InvalidName(key.to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::KeyTooLong {
            key: key.to_string(),
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    Ok(())
}

/// Check a value size against the limit for its kind.
pub fn check_value_len(key: &str, kind: EntryKind, len: usize) -> Result<(), StoreError> {
    let max = match kind {
        EntryKind::I32 => return Ok(()),
        EntryKind::Str => MAX_STR_LEN,
        EntryKind::Blob => MAX_BLOB_LEN,
    };
    if len > max {
        return Err(StoreError::ValueTooLong {
            key: key.to_string(),
            len,
            max,
        });
    }
    Ok(())
}

/// Copy a sized value into an optional caller buffer, following the
/// size-query protocol. Returns the value size.
pub(crate) fn copy_sized(
    key: &str,
    value: &[u8],
    buf: Option<&mut [u8]>,
) -> Result<usize, StoreError> {
    let Some(buf) = buf else {
        return Ok(value.len());
    };
    let Some(dst) = buf.get_mut(..value.len()) else {
        return Err(StoreError::InvalidLength {
            key: key.to_string(),
            needed: value.len(),
            available: buf.len(),
        });
    };
    dst.copy_from_slice(value);
    Ok(value.len())
}
