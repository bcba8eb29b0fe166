//! Typed key-value accessors over a flash-backed NVS namespace.
//!
//! The [`Memory`] façade opens one namespace of a non-volatile storage
//! partition and exposes integer, string and blob get/set operations on top
//! of it. Recoverable partition states (full, or written in a different
//! format) are handled by erasing and initializing again.
//!
//! # Quick Start
//!
//! ```
//! use nvs_kv::prelude::*;
//!
//! let mut memory = Memory::new(MemoryNvs::new());
//! memory.init()?;
//!
//! memory.set_i32("counter", 1234)?;
//! memory.set_str("greeting", "Hola ESP32")?;
//!
//! assert_eq!(memory.get_i32("counter")?, 1234);
//! assert_eq!(memory.get_str("greeting")?, "Hola ESP32");
//!
//! memory.deinit()?;
//! # Ok::<(), nvs_kv::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`memory`] - The typed accessor façade (always available)
//! - [`nvs`] - The backend contract and its implementations
//!
//! # Feature Flags
//!
//! - `fjall` - Enable the persistent host backend (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the command-line interface binary
//! - `full` - Enable all features

#[cfg(feature = "cli")]
pub mod cli;
mod error;
mod logging;
pub mod memory;
pub mod nvs;
pub mod prelude;

// Re-export the unified error type
pub use error::{Error, Result};

// Re-export the façade at crate root for convenience
pub use memory::{DEFAULT_NAMESPACE, Memory, MemoryError, MemoryState, Value, ValueType};
pub use nvs::{MemoryNvs, NvsBackend, StoreError};

#[cfg(feature = "fjall")]
pub use nvs::FjallNvs;
