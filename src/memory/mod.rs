//! Application memory: typed get/set over one NVS namespace.
//!
//! [`Memory`] wraps an [`NvsBackend`](crate::nvs::NvsBackend) and exposes
//! integer, string and blob accessors keyed by short names. The caller names
//! the value type on every call; nothing about the stored type is inferred.

mod error;
mod facade;
mod value;

pub use error::MemoryError;
pub use facade::{DEFAULT_NAMESPACE, Memory, MemoryState};
pub use value::{ParseValueTypeError, Value, ValueType};
