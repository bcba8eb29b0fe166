//! Non-volatile storage backends.
//!
//! The [`NvsBackend`] trait captures the primitives of a namespace-scoped
//! flash key-value store. Two implementations are provided: [`MemoryNvs`],
//! a RAM simulation with fault injection, and [`FjallNvs`], a persistent
//! host backend (requires the `fjall` feature).

mod backend;
mod error;
mod memory;

#[cfg(feature = "fjall")]
mod entry;
#[cfg(feature = "fjall")]
mod fjall_store;

pub use backend::{
    EntryKind, MAX_BLOB_LEN, MAX_KEY_LEN, MAX_STR_LEN, NamespaceHandle, NvsBackend, OpenMode,
    check_key, check_namespace, check_value_len,
};
pub use error::StoreError;
pub use memory::{MemoryNvs, MemoryNvsStats};

#[cfg(feature = "fjall")]
pub use fjall_store::{FORMAT_VERSION, FjallNvs};
