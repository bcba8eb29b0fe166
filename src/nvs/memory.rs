//! In-memory NVS backend.
//!
//! Simulates an NVS partition in RAM for host-side tests. Besides the
//! ordinary contract it supports:
//! - separate pending and committed state, with [`MemoryNvs::power_cycle`]
//!   dropping anything that was never committed
//! - fault injection for init, open, write, commit and size queries
//! - operation counters, so tests can assert that a call touched nothing

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::backend::{
    EntryKind, NamespaceHandle, NvsBackend, OpenMode, check_key, check_namespace,
    check_value_len, copy_sized,
};
use super::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    kind: EntryKind,
    data: Vec<u8>,
}

type Namespace = BTreeMap<String, Entry>;

#[derive(Debug)]
struct OpenNamespace {
    name: String,
    mode: OpenMode,
}

#[derive(Debug, Default)]
struct Faults {
    init: VecDeque<StoreError>,
    open: Option<StoreError>,
    write: Option<StoreError>,
    commit: Option<StoreError>,
    reported_size: Cell<Option<usize>>,
}

/// Counters of operations that reached the simulated partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryNvsStats {
    pub inits: u32,
    pub erases: u32,
    pub writes: u32,
    pub commits: u32,
}

/// RAM-backed NVS partition.
///
/// # Example
///
/// ```
/// use nvs_kv::nvs::{MemoryNvs, NvsBackend, OpenMode};
///
/// let mut nvs = MemoryNvs::new();
/// nvs.flash_init().unwrap();
/// let handle = nvs.open("app_memory", OpenMode::ReadWrite).unwrap();
///
/// nvs.set_i32(handle, "boots", 3).unwrap();
/// nvs.commit(handle).unwrap();
/// assert_eq!(nvs.get_i32(handle, "boots").unwrap(), 3);
/// ```
#[derive(Debug, Default)]
pub struct MemoryNvs {
    initialized: bool,
    committed: BTreeMap<String, Namespace>,
    pending: BTreeMap<String, Namespace>,
    handles: HashMap<u32, OpenNamespace>,
    next_handle: u32,
    faults: Faults,
    stats: MemoryNvsStats,
}

impl MemoryNvs {
    /// Create an empty, uninitialized partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation counters since creation.
    pub fn stats(&self) -> MemoryNvsStats {
        self.stats
    }

    /// Make the next `flash_init` calls fail, one queued error per call.
    pub fn queue_init_error(&mut self, err: StoreError) {
        self.faults.init.push_back(err);
    }

    /// Make the next `open` fail with `err`.
    pub fn fail_next_open(&mut self, err: StoreError) {
        self.faults.open = Some(err);
    }

    /// Make the next `set_*` fail with `err` without storing anything.
    pub fn fail_next_write(&mut self, err: StoreError) {
        self.faults.write = Some(err);
    }

    /// Make the next `commit` fail with `err`. Pending writes stay pending.
    pub fn fail_next_commit(&mut self, err: StoreError) {
        self.faults.commit = Some(err);
    }

    /// Make the next size query report `size` instead of the stored size.
    pub fn report_next_size(&mut self, size: usize) {
        self.faults.reported_size.set(Some(size));
    }

    /// Simulate a reset: uncommitted writes are lost, handles are closed and
    /// the partition must be initialized again.
    pub fn power_cycle(&mut self) {
        self.pending.clear();
        self.handles.clear();
        self.initialized = false;
    }

    /// Whether `key` holds a committed value in `namespace`.
    pub fn is_committed(&self, namespace: &str, key: &str) -> bool {
        self.committed
            .get(namespace)
            .is_some_and(|ns| ns.contains_key(key))
    }

    /// Number of keys visible in `namespace`, pending or committed.
    pub fn key_count(&self, namespace: &str) -> usize {
        let mut keys: Vec<&String> = self
            .committed
            .get(namespace)
            .into_iter()
            .chain(self.pending.get(namespace))
            .flat_map(|ns| ns.keys())
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    fn namespace_of(&self, handle: NamespaceHandle) -> Result<&OpenNamespace, StoreError> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        self.handles
            .get(&handle.get())
            .ok_or(StoreError::InvalidHandle(handle.get()))
    }

    fn lookup(&self, handle: NamespaceHandle, key: &str) -> Result<&Entry, StoreError> {
        let open = self.namespace_of(handle)?;
        check_key(key)?;
        self.pending
            .get(&open.name)
            .and_then(|ns| ns.get(key))
            .or_else(|| self.committed.get(&open.name).and_then(|ns| ns.get(key)))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn lookup_kind(
        &self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
    ) -> Result<&Entry, StoreError> {
        let entry = self.lookup(handle, key)?;
        if entry.kind != kind {
            return Err(StoreError::TypeMismatch {
                key: key.to_string(),
                stored: entry.kind.name(),
                requested: kind.name(),
            });
        }
        Ok(entry)
    }

    fn get_sized(
        &self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError> {
        let entry = self.lookup_kind(handle, key, kind)?;
        if buf.is_none() {
            if let Some(size) = self.faults.reported_size.take() {
                return Ok(size);
            }
        }
        copy_sized(key, &entry.data, buf)
    }

    fn write(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
        data: Vec<u8>,
    ) -> Result<(), StoreError> {
        let open = self.namespace_of(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(StoreError::ReadOnly);
        }
        let name = open.name.clone();
        check_key(key)?;
        check_value_len(key, kind, data.len())?;
        if let Some(err) = self.faults.write.take() {
            return Err(err);
        }

        self.pending
            .entry(name)
            .or_default()
            .insert(key.to_string(), Entry { kind, data });
        self.stats.writes += 1;
        Ok(())
    }
}

impl NvsBackend for MemoryNvs {
    fn flash_init(&mut self) -> Result<(), StoreError> {
        self.stats.inits += 1;
        if let Some(err) = self.faults.init.pop_front() {
            return Err(err);
        }
        self.initialized = true;
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StoreError> {
        self.committed.clear();
        self.pending.clear();
        self.handles.clear();
        self.initialized = false;
        self.stats.erases += 1;
        Ok(())
    }

    fn open(&mut self, namespace: &str, mode: OpenMode) -> Result<NamespaceHandle, StoreError> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        check_namespace(namespace)?;
        if let Some(err) = self.faults.open.take() {
            return Err(err);
        }

        match mode {
            OpenMode::ReadWrite => {
                self.committed.entry(namespace.to_string()).or_default();
            }
            OpenMode::ReadOnly => {
                if !self.committed.contains_key(namespace) {
                    return Err(StoreError::NotFound(namespace.to_string()));
                }
            }
        }

        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        let handle = NamespaceHandle::new(self.next_handle)
            .ok_or(StoreError::InvalidHandle(self.next_handle))?;
        self.handles.insert(
            handle.get(),
            OpenNamespace {
                name: namespace.to_string(),
                mode,
            },
        );
        Ok(handle)
    }

    fn close(&mut self, handle: NamespaceHandle) {
        self.handles.remove(&handle.get());
    }

    fn get_i32(&self, handle: NamespaceHandle, key: &str) -> Result<i32, StoreError> {
        let entry = self.lookup_kind(handle, key, EntryKind::I32)?;
        let bytes: [u8; 4] = entry
            .data
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Corrupted(key.to_string()))?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn get_str(
        &self,
        handle: NamespaceHandle,
        key: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError> {
        self.get_sized(handle, key, EntryKind::Str, buf)
    }

    fn get_blob(
        &self,
        handle: NamespaceHandle,
        key: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError> {
        self.get_sized(handle, key, EntryKind::Blob, buf)
    }

    fn set_i32(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: i32,
    ) -> Result<(), StoreError> {
        self.write(handle, key, EntryKind::I32, value.to_le_bytes().to_vec())
    }

    fn set_str(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if value.contains('\0') {
            return Err(StoreError::InvalidArgument(format!(
                "string for key '{}' contains a NUL byte",
                key
            )));
        }
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value.as_bytes());
        data.push(0);
        self.write(handle, key, EntryKind::Str, data)
    }

    fn set_blob(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        self.write(handle, key, EntryKind::Blob, value.to_vec())
    }

    fn commit(&mut self, handle: NamespaceHandle) -> Result<(), StoreError> {
        let open = self.namespace_of(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(StoreError::ReadOnly);
        }
        let name = open.name.clone();
        if let Some(err) = self.faults.commit.take() {
            return Err(err);
        }

        if let Some(pending) = self.pending.remove(&name) {
            self.committed.entry(name).or_default().extend(pending);
        }
        self.stats.commits += 1;
        Ok(())
    }
}
