//! Typed accessors over a single NVS namespace.

use crate::logging::{debug, error, info, trace, warn};
use crate::nvs::{EntryKind, NamespaceHandle, NvsBackend, OpenMode};

use super::error::MemoryError;
use super::value::{Value, ValueType};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "app_memory";

/// Lifecycle state of a [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryState {
    /// Before `init` or after `deinit`. Every get/set fails with
    /// [`MemoryError::InvalidState`].
    Closed,
    /// A namespace handle is held.
    Open,
}

/// Application memory: typed get/set over one namespace of an NVS backend.
///
/// Owns the backend and at most one namespace handle. Reads take `&self`
/// and writes take `&mut self`; every successful write is committed before
/// the call returns.
///
/// # Example
///
/// ```
/// use nvs_kv::memory::Memory;
/// use nvs_kv::nvs::MemoryNvs;
///
/// let mut memory = Memory::new(MemoryNvs::new());
/// memory.init().unwrap();
///
/// memory.set_i32("counter", 1234).unwrap();
/// assert_eq!(memory.get_i32("counter").unwrap(), 1234);
///
/// memory.set_str("greeting", "Hola ESP32").unwrap();
/// assert_eq!(memory.get_str("greeting").unwrap(), "Hola ESP32");
///
/// memory.deinit().unwrap();
/// assert!(memory.get_i32("counter").unwrap_err().is_invalid_state());
/// ```
#[derive(Debug)]
pub struct Memory<B: NvsBackend> {
    backend: B,
    namespace: String,
    handle: Option<NamespaceHandle>,
}

impl<B: NvsBackend> Memory<B> {
    /// Create a closed façade over `backend` using [`DEFAULT_NAMESPACE`].
    pub fn new(backend: B) -> Self {
        Self::with_namespace(backend, DEFAULT_NAMESPACE)
    }

    /// Create a closed façade over `backend` for the given namespace.
    pub fn with_namespace(backend: B, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            handle: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> MemoryState {
        match self.handle {
            Some(_) => MemoryState::Open,
            None => MemoryState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend, bypassing the accessors.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Initialize the partition and open the namespace read-write.
    ///
    /// If the partition reports that it is full or was written in a different
    /// format, it is erased and initialized once more before giving up.
    /// Calling `init` while open fails with [`MemoryError::InvalidState`].
    pub fn init(&mut self) -> Result<(), MemoryError> {
        if self.handle.is_some() {
            error!(namespace = %self.namespace, "init called while already open");
            return Err(MemoryError::InvalidState);
        }

        self.init_partition()?;

        let handle = self
            .backend
            .open(&self.namespace, OpenMode::ReadWrite)
            .map_err(|e| {
                error!(namespace = %self.namespace, error = %e, "failed to open namespace");
                MemoryError::from(e)
            })?;

        self.handle = Some(handle);
        info!(namespace = %self.namespace, handle = handle.get(), "memory initialized");
        Ok(())
    }

    fn init_partition(&mut self) -> Result<(), MemoryError> {
        let err = match self.backend.flash_init() {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if !err.needs_erase() {
            error!(error = %err, "failed to initialize NVS partition");
            return Err(err.into());
        }

        warn!(error = %err, "NVS partition needs erase, erasing and retrying");
        self.backend.erase_all().map_err(|e| {
            error!(error = %e, "failed to erase NVS partition");
            MemoryError::from(e)
        })?;
        self.backend.flash_init().map_err(|e| {
            error!(error = %e, "failed to initialize NVS partition after erase");
            MemoryError::from(e)
        })
    }

    /// Close the namespace handle if one is open. Always succeeds.
    pub fn deinit(&mut self) -> Result<(), MemoryError> {
        if let Some(handle) = self.handle.take() {
            self.backend.close(handle);
            info!(namespace = %self.namespace, "memory closed");
        }
        Ok(())
    }

    /// Read the value of type `ty` stored under `key`.
    ///
    /// Strings and blobs are returned as owned buffers sized from the store's
    /// size query.
    pub fn get(&self, ty: ValueType, key: &str) -> Result<Value, MemoryError> {
        self.read(ty, key).inspect_err(|_err| {
            warn!(key = key, value_type = %ty, error = %_err, "failed to read key");
        })
    }

    pub fn get_i32(&self, key: &str) -> Result<i32, MemoryError> {
        let value = self.get(ValueType::Int, key)?;
        value.as_i32().ok_or_else(|| type_confusion(key, ValueType::Int))
    }

    pub fn get_str(&self, key: &str) -> Result<String, MemoryError> {
        let value = self.get(ValueType::String, key)?;
        value
            .into_string()
            .ok_or_else(|| type_confusion(key, ValueType::String))
    }

    pub fn get_blob(&self, key: &str) -> Result<Vec<u8>, MemoryError> {
        let value = self.get(ValueType::Blob, key)?;
        value
            .into_blob()
            .ok_or_else(|| type_confusion(key, ValueType::Blob))
    }

    /// Read using a raw type tag (0 = blob, 1 = string, 2 = int).
    /// Unknown tags fail with [`MemoryError::NotSupported`].
    pub fn get_tagged(&self, tag: u32, key: &str) -> Result<Value, MemoryError> {
        self.handle()?;
        match ValueType::from_tag(tag) {
            Some(ty) => self.get(ty, key),
            None => {
                let err = MemoryError::NotSupported(format!("unknown value type tag {}", tag));
                warn!(key = key, tag = tag, "failed to read key: unknown type tag");
                Err(err)
            }
        }
    }

    /// Write `value` under `key` and commit.
    ///
    /// Blob values fail with [`MemoryError::NotSupported`] whatever the key,
    /// and leave the store untouched. If the write succeeds but the commit fails, the
    /// commit error is returned and the value may or may not be durable.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), MemoryError> {
        self.write(key, value).inspect_err(|_err| {
            error!(
                key = key,
                value_type = %value.value_type(),
                error = %_err,
                "failed to write key"
            );
        })
    }

    pub fn set_i32(&mut self, key: &str, value: i32) -> Result<(), MemoryError> {
        self.set(key, &Value::Int(value))
    }

    pub fn set_str(&mut self, key: &str, value: &str) -> Result<(), MemoryError> {
        self.set(key, &Value::from(value))
    }

    /// Write using a raw type tag (0 = blob, 1 = string, 2 = int).
    ///
    /// Unknown tags, and tags that disagree with `value`, fail with
    /// [`MemoryError::InvalidArgument`]. The blob tag fails with
    /// [`MemoryError::NotSupported`].
    pub fn set_tagged(&mut self, tag: u32, key: &str, value: &Value) -> Result<(), MemoryError> {
        let checked = self.handle().and_then(|_| match ValueType::from_tag(tag) {
            None => Err(MemoryError::InvalidArgument(format!(
                "unknown value type tag {}",
                tag
            ))),
            Some(ValueType::Blob) => Err(blob_write_not_supported()),
            Some(ty) if ty != value.value_type() => Err(MemoryError::InvalidArgument(format!(
                "type tag {} does not match a {} value",
                ty,
                value.value_type()
            ))),
            Some(_) => Ok(()),
        });

        match checked {
            Ok(()) => self.set(key, value),
            Err(e) => {
                error!(key = key, tag = tag, error = %e, "failed to write key");
                Err(e)
            }
        }
    }

    fn handle(&self) -> Result<NamespaceHandle, MemoryError> {
        self.handle.ok_or(MemoryError::InvalidState)
    }

    fn read(&self, ty: ValueType, key: &str) -> Result<Value, MemoryError> {
        let handle = self.handle()?;
        check_key_arg(key)?;
        trace!(key = key, value_type = %ty, "reading");

        match ty {
            ValueType::Int => Ok(Value::Int(self.backend.get_i32(handle, key)?)),
            ValueType::String => {
                let mut bytes = self.read_sized(handle, key, ty.entry_kind())?;
                if bytes.last() == Some(&0) {
                    bytes.pop();
                }
                let text = String::from_utf8(bytes)
                    .map_err(|_| MemoryError::InvalidUtf8(key.to_string()))?;
                Ok(Value::Str(text))
            }
            ValueType::Blob => Ok(Value::Blob(self.read_sized(handle, key, ty.entry_kind())?)),
        }
    }

    /// Size query, exact allocation, then the read itself. The buffer is
    /// dropped on any failure.
    fn read_sized(
        &self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
    ) -> Result<Vec<u8>, MemoryError> {
        let size = self.query_sized(handle, key, kind, None)?;
        debug!(key = key, size = size, "allocating read buffer");

        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| MemoryError::NoMemory {
            key: key.to_string(),
            size,
        })?;
        buf.resize(size, 0);

        let read = self.query_sized(handle, key, kind, Some(&mut buf))?;
        buf.truncate(read);
        Ok(buf)
    }

    fn query_sized(
        &self,
        handle: NamespaceHandle,
        key: &str,
        kind: EntryKind,
        buf: Option<&mut [u8]>,
    ) -> Result<usize, MemoryError> {
        let size = match kind {
            EntryKind::Str => self.backend.get_str(handle, key, buf)?,
            _ => self.backend.get_blob(handle, key, buf)?,
        };
        Ok(size)
    }

    fn write(&mut self, key: &str, value: &Value) -> Result<(), MemoryError> {
        let handle = self.handle()?;
        if let Value::Blob(_) = value {
            return Err(blob_write_not_supported());
        }
        check_key_arg(key)?;
        trace!(key = key, value_type = %value.value_type(), "writing");

        match value {
            Value::Int(v) => self.backend.set_i32(handle, key, *v)?,
            Value::Str(s) => {
                if s.contains('\0') {
                    return Err(MemoryError::InvalidArgument(format!(
                        "string for key '{}' contains a NUL byte",
                        key
                    )));
                }
                self.backend.set_str(handle, key, s)?;
            }
            Value::Blob(_) => return Err(blob_write_not_supported()),
        }

        self.backend.commit(handle)?;
        debug!(key = key, "write committed");
        Ok(())
    }
}

fn check_key_arg(key: &str) -> Result<(), MemoryError> {
    if key.is_empty() {
        return Err(MemoryError::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

fn blob_write_not_supported() -> MemoryError {
    MemoryError::NotSupported("blob values have no implied length and cannot be set".to_string())
}

fn type_confusion(key: &str, expected: ValueType) -> MemoryError {
    MemoryError::InvalidArgument(format!("value read for key '{}' is not a {}", key, expected))
}
