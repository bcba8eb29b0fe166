//! Persistent NVS backend on top of fjall.
//!
//! Lets the typed accessors run on a development host with real
//! persistence. Each NVS namespace maps to one fjall keyspace; a `_meta`
//! keyspace records the partition format version and which namespaces exist.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use fjall::{Keyspace, KeyspaceCreateOptions, PersistMode};

use crate::logging::{debug, info, trace, warn};

use super::backend::{
    EntryKind, NamespaceHandle, NvsBackend, OpenMode, check_key, check_namespace,
    check_value_len, copy_sized,
};
use super::entry;
use super::error::StoreError;

/// Key prefix for the namespace registry in the metadata keyspace.
const META_NAMESPACES_PREFIX: &str = "namespaces/";
const META_CONFIG_KEY: &str = "config";

/// Namespace keyspace prefix.
const NAMESPACE_PREFIX: &str = "ns_";

/// Partition format version (1).
/// A partition written with any other version is reported as
/// `NewVersionFound` so that `init` can erase it.
pub const FORMAT_VERSION: u32 = 1;

struct OpenKeyspace {
    name: String,
    keyspace: Keyspace,
    mode: OpenMode,
}

/// NVS partition stored in a fjall database directory.
///
/// # Example
///
/// ```ignore
/// use nvs_kv::nvs::{FjallNvs, NvsBackend, OpenMode};
///
/// let mut nvs = FjallNvs::new(".nvs-kv");
/// nvs.flash_init()?;
/// let handle = nvs.open("app_memory", OpenMode::ReadWrite)?;
/// nvs.set_i32(handle, "boots", 1)?;
/// nvs.commit(handle)?;
/// ```
pub struct FjallNvs {
    path: PathBuf,
    db: Option<fjall::Database>,
    initialized: bool,
    handles: HashMap<u32, OpenKeyspace>,
    next_handle: u32,
}

impl FjallNvs {
    /// Create a backend for the partition directory at `path`.
    ///
    /// Nothing is touched on disk until [`flash_init`](NvsBackend::flash_init)
    /// or [`erase_all`](NvsBackend::erase_all).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            db: None,
            initialized: false,
            handles: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Partition directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every namespace ever opened read-write, in key order.
    pub fn namespaces(&mut self) -> Result<Vec<String>, StoreError> {
        let meta = self.meta()?;
        let mut names = Vec::new();
        for kv in meta.prefix(META_NAMESPACES_PREFIX) {
            let Ok(key_bytes) = kv.key() else {
                continue;
            };
            let key_str = String::from_utf8_lossy(&key_bytes);
            if let Some(name) = key_str.strip_prefix(META_NAMESPACES_PREFIX) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Overwrite the stored format version. Used to simulate a partition left
    /// behind by different firmware.
    pub fn write_format_version(&mut self, version: u32) -> Result<(), StoreError> {
        let meta = self.meta()?;
        meta.insert(META_CONFIG_KEY, version.to_le_bytes())?;
        self.database()?.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn database(&mut self) -> Result<&fjall::Database, StoreError> {
        if self.db.is_none() {
            debug!(path = %self.path.display(), "opening fjall database");
            self.db = Some(fjall::Database::builder(&self.path).open()?);
        }
        self.db.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn meta(&mut self) -> Result<Keyspace, StoreError> {
        let meta = self
            .database()?
            .keyspace("_meta", KeyspaceCreateOptions::default)?;
        Ok(meta)
    }

    fn namespace_keyspace(&mut self, name: &str) -> Result<Keyspace, StoreError> {
        let keyspace_name = keyspace_name(name);
        let keyspace = self
            .database()?
            .keyspace(&keyspace_name, KeyspaceCreateOptions::default)?;
        Ok(keyspace)
    }

    fn open_keyspace(&self, handle: NamespaceHandle) -> Result<&OpenKeyspace, StoreError> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        self.handles
            .get(&handle.get())
            .ok_or(StoreError::InvalidHandle(handle.get()))
    }

    fn read_entry(
        &self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
    ) -> Result<Vec<u8>, StoreError> {
        let open = self.open_keyspace(handle)?;
        check_key(key)?;
        trace!(namespace = %open.name, key = key, "reading entry");

        let raw = open
            .keyspace
            .get(key)?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let (stored, payload) = entry::decode(key, raw.as_ref())?;
        if stored != kind {
            return Err(StoreError::TypeMismatch {
                key: key.to_string(),
                stored: stored.name(),
                requested: kind.name(),
            });
        }
        Ok(payload.to_vec())
    }

    fn write_entry(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        let open = self.open_keyspace(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(StoreError::ReadOnly);
        }
        check_key(key)?;
        check_value_len(key, kind, payload.len())?;
        trace!(namespace = %open.name, key = key, kind = kind.name(), "writing entry");

        let encoded = entry::encode(kind, payload);
        open.keyspace.insert(key, encoded.as_slice())?;
        Ok(())
    }
}

/// Keyspace names are restricted to a small alphabet, so the namespace name
/// is hex encoded.
fn keyspace_name(namespace: &str) -> String {
    let mut name = String::with_capacity(NAMESPACE_PREFIX.len() + namespace.len() * 2);
    name.push_str(NAMESPACE_PREFIX);
    for byte in namespace.bytes() {
        let _ = write!(name, "{:02x}", byte);
    }
    name
}

fn clear_keyspace(keyspace: &Keyspace) -> Result<(), StoreError> {
    // Skip any keys that fail to read
    let keys: Vec<Vec<u8>> = keyspace
        .iter()
        .filter_map(|kv| kv.key().ok().map(|k| k.to_vec()))
        .collect();
    for k in keys {
        keyspace.remove(&k)?;
    }
    Ok(())
}

impl NvsBackend for FjallNvs {
    fn flash_init(&mut self) -> Result<(), StoreError> {
        let meta = self.meta()?;

        match meta.get(META_CONFIG_KEY)? {
            Some(config) => {
                let bytes: [u8; 4] = config
                    .as_ref()
                    .try_into()
                    .map_err(|_| StoreError::Corrupted(META_CONFIG_KEY.to_string()))?;
                let version = u32::from_le_bytes(bytes);
                if version != FORMAT_VERSION {
                    warn!(
                        stored_version = version,
                        expected_version = FORMAT_VERSION,
                        "partition format version mismatch"
                    );
                    return Err(StoreError::NewVersionFound {
                        found: version,
                        expected: FORMAT_VERSION,
                    });
                }
                trace!(version = version, "partition format version verified");
            }
            None => {
                meta.insert(META_CONFIG_KEY, FORMAT_VERSION.to_le_bytes())?;
                self.database()?.persist(PersistMode::SyncAll)?;
                debug!(version = FORMAT_VERSION, "formatted new partition");
            }
        }

        self.initialized = true;
        info!(path = %self.path.display(), "NVS partition initialized");
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), StoreError> {
        info!(path = %self.path.display(), "erasing NVS partition");
        for name in self.namespaces()? {
            let keyspace = self.namespace_keyspace(&name)?;
            clear_keyspace(&keyspace)?;
        }
        let meta = self.meta()?;
        clear_keyspace(&meta)?;
        self.database()?.persist(PersistMode::SyncAll)?;

        self.handles.clear();
        self.initialized = false;
        Ok(())
    }

    fn open(&mut self, namespace: &str, mode: OpenMode) -> Result<NamespaceHandle, StoreError> {
        if !self.initialized {
            return Err(StoreError::NotInitialized);
        }
        check_namespace(namespace)?;

        let meta = self.meta()?;
        let registry_key = format!("{}{}", META_NAMESPACES_PREFIX, namespace);
        match mode {
            OpenMode::ReadOnly => {
                if meta.get(&registry_key)?.is_none() {
                    return Err(StoreError::NotFound(namespace.to_string()));
                }
            }
            OpenMode::ReadWrite => {
                if meta.get(&registry_key)?.is_none() {
                    meta.insert(&registry_key, keyspace_name(namespace).as_bytes())?;
                    self.database()?.persist(PersistMode::SyncAll)?;
                    debug!(namespace = namespace, "created namespace");
                }
            }
        }

        let keyspace = self.namespace_keyspace(namespace)?;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        let handle = NamespaceHandle::new(self.next_handle)
            .ok_or(StoreError::InvalidHandle(self.next_handle))?;
        self.handles.insert(
            handle.get(),
            OpenKeyspace {
                name: namespace.to_string(),
                keyspace,
                mode,
            },
        );
        debug!(namespace = namespace, handle = handle.get(), "namespace opened");
        Ok(handle)
    }

    fn close(&mut self, handle: NamespaceHandle) {
        if let Some(_open) = self.handles.remove(&handle.get()) {
            debug!(namespace = %_open.name, handle = handle.get(), "namespace closed");
        }
    }

    fn get_i32(&self, handle: NamespaceHandle, key: &str) -> Result<i32, StoreError> {
        let payload = self.read_entry(handle, key, EntryKind::I32)?;
        let bytes: [u8; 4] = payload
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
        let payload = self.read_entry(handle, key, EntryKind::Str)?;
        copy_sized(key, &payload, buf)
    }

    fn get_blob(
        &self,
        handle: NamespaceHandle,
        key: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, StoreError> {
        let payload = self.read_entry(handle, key, EntryKind::Blob)?;
        copy_sized(key, &payload, buf)
    }

    fn set_i32(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: i32,
    ) -> Result<(), StoreError> {
        self.write_entry(handle, key, EntryKind::I32, &value.to_le_bytes())
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
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
        self.write_entry(handle, key, EntryKind::Str, &payload)
    }

    fn set_blob(
        &mut self,
        handle: NamespaceHandle,
        key: &str,
        value: &[u8],
    ) -> Result<(), StoreError> {
        self.write_entry(handle, key, EntryKind::Blob, value)
    }

    fn commit(&mut self, handle: NamespaceHandle) -> Result<(), StoreError> {
        let open = self.open_keyspace(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(StoreError::ReadOnly);
        }
        trace!(namespace = %open.name, "committing");
        self.database()?.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
