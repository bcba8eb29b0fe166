//! Value types understood by the typed accessors.

use std::fmt;
use std::str::FromStr;

use crate::nvs::EntryKind;

/// Semantic type of a value, supplied by the caller on every call.
///
/// The numeric tags are stable and used by the raw-tag entry points
/// ([`Memory::get_tagged`](super::Memory::get_tagged) and
/// [`Memory::set_tagged`](super::Memory::set_tagged)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ValueType {
    /// Opaque bytes. Readable, but not writable through `set`.
    Blob,
    /// UTF-8 text, stored NUL-terminated.
    String,
    /// 32-bit signed integer.
    Int,
}

impl ValueType {
    pub const fn tag(self) -> u32 {
        match self {
            Self::Blob => 0,
            Self::String => 1,
            Self::Int => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Blob),
            1 => Some(Self::String),
            2 => Some(Self::Int),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::String => "string",
            Self::Int => "int",
        }
    }

    /// Store entry kind backing this type.
    pub const fn entry_kind(self) -> EntryKind {
        match self {
            Self::Blob => EntryKind::Blob,
            Self::String => EntryKind::Str,
            Self::Int => EntryKind::I32,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value type '{0}' (expected int, string or blob)")]
pub struct ParseValueTypeError(String);

impl FromStr for ValueType {
    type Err = ParseValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" | "i32" => Ok(Self::Int),
            "string" | "str" => Ok(Self::String),
            "blob" => Ok(Self::Blob),
            other => Err(ParseValueTypeError(other.to_string())),
        }
    }
}

/// A typed value read from or written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Str(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Str(_) => ValueType::String,
            Self::Blob(_) => ValueType::Blob,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Vec<u8>> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// Integers print in decimal, strings verbatim, blobs as lowercase hex.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Str(s) => f.write_str(s),
            Self::Blob(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Blob(b.to_vec())
    }
}
