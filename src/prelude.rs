//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```
//! use nvs_kv::prelude::*;
//!
//! let mut memory = Memory::new(MemoryNvs::new());
//! memory.init()?;
//! memory.set_i32("counter", 1234)?;
//! assert_eq!(memory.get(ValueType::Int, "counter")?, Value::Int(1234));
//! # Ok::<(), nvs_kv::Error>(())
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Typed accessors
pub use crate::memory::{DEFAULT_NAMESPACE, Memory, MemoryError, MemoryState, Value, ValueType};

// Backends
pub use crate::nvs::{MemoryNvs, NamespaceHandle, NvsBackend, OpenMode, StoreError};

#[cfg(feature = "fjall")]
pub use crate::nvs::FjallNvs;
