//! Common test utilities and fixtures.
//!
//! Shared constants and helpers for the integration tests.

#![allow(dead_code)]

#[cfg(feature = "fjall")]
use std::path::PathBuf;

#[cfg(feature = "fjall")]
use nvs_kv::FjallNvs;
use nvs_kv::{Memory, MemoryNvs, StoreError};
#[cfg(feature = "fjall")]
use tempfile::TempDir;

// =============================================================================
// Demo Values
// =============================================================================

pub const COUNTER_KEY: &str = "counter";
pub const COUNTER_VALUE: i32 = 1234;

pub const GREETING_KEY: &str = "greeting";
pub const GREETING_VALUE: &str = "Hola ESP32";

/// A key at the 15-byte limit.
pub const LONGEST_KEY: &str = "exactly_15_char";

// =============================================================================
// In-memory Fixtures
// =============================================================================

/// An initialized façade over a fresh RAM partition.
pub fn open_memory() -> anyhow::Result<Memory<MemoryNvs>> {
    let mut memory = Memory::new(MemoryNvs::new());
    memory.init()?;
    Ok(memory)
}

/// A closed façade whose partition will report `errors` on the next inits.
pub fn memory_with_init_errors(errors: Vec<StoreError>) -> Memory<MemoryNvs> {
    let mut nvs = MemoryNvs::new();
    for err in errors {
        nvs.queue_init_error(err);
    }
    Memory::new(nvs)
}

/// Write the demo integer and string through `memory`.
pub fn write_demo_values(memory: &mut Memory<MemoryNvs>) -> anyhow::Result<()> {
    memory.set_i32(COUNTER_KEY, COUNTER_VALUE)?;
    memory.set_str(GREETING_KEY, GREETING_VALUE)?;
    Ok(())
}

// =============================================================================
// On-disk Fixtures
// =============================================================================

/// A temporary directory holding one fjall partition.
#[cfg(feature = "fjall")]
pub struct TestStore {
    pub path: PathBuf,
    _temp_dir: TempDir, // Keep alive for test duration
}

#[cfg(feature = "fjall")]
impl TestStore {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nvs");
        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// A new backend over this partition. Each call reopens the database.
    pub fn backend(&self) -> FjallNvs {
        FjallNvs::new(&self.path)
    }

    /// An initialized façade over this partition.
    pub fn open_memory(&self) -> anyhow::Result<Memory<FjallNvs>> {
        let mut memory = Memory::new(self.backend());
        memory.init()?;
        Ok(memory)
    }
}
