//! End-to-end behaviour of the typed accessors over the RAM backend.

mod common;

use common::{
    COUNTER_KEY, COUNTER_VALUE, GREETING_KEY, GREETING_VALUE, LONGEST_KEY,
    memory_with_init_errors, open_memory, write_demo_values,
};
use nvs_kv::nvs::{NvsBackend, OpenMode};
use nvs_kv::{Memory, MemoryError, MemoryNvs, MemoryState, StoreError, Value, ValueType};

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_counter_round_trip() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set(COUNTER_KEY, &Value::Int(COUNTER_VALUE))?;
    assert_eq!(memory.get(ValueType::Int, COUNTER_KEY)?, Value::Int(COUNTER_VALUE));

    Ok(())
}

#[test]
fn test_greeting_round_trip() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set(GREETING_KEY, &Value::from(GREETING_VALUE))?;
    assert_eq!(
        memory.get(ValueType::String, GREETING_KEY)?,
        Value::from(GREETING_VALUE)
    );

    // The store holds the terminator as well
    let handle = memory
        .backend_mut()
        .open(nvs_kv::DEFAULT_NAMESPACE, OpenMode::ReadOnly)?;
    assert_eq!(memory.backend().get_str(handle, GREETING_KEY, None)?, 11);

    Ok(())
}

#[test]
fn test_overwrite_replaces_value() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set_i32(COUNTER_KEY, 1)?;
    memory.set_i32(COUNTER_KEY, -1)?;
    assert_eq!(memory.get_i32(COUNTER_KEY)?, -1);

    // A different type under the same key replaces the entry
    memory.set_str(COUNTER_KEY, "one")?;
    assert_eq!(memory.get_str(COUNTER_KEY)?, "one");
    assert!(matches!(
        memory.get(ValueType::Int, COUNTER_KEY),
        Err(MemoryError::Store(StoreError::TypeMismatch { .. }))
    ));

    Ok(())
}

#[test]
fn test_key_length_limit() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set_i32(LONGEST_KEY, 15)?;
    assert_eq!(memory.get_i32(LONGEST_KEY)?, 15);

    let too_long = format!("{}x", LONGEST_KEY);
    assert!(matches!(
        memory.set_i32(&too_long, 16),
        Err(MemoryError::Store(StoreError::KeyTooLong { len: 16, .. }))
    ));

    Ok(())
}

#[test]
fn test_unicode_string() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set_str("motd", "¡Hola, señor! 🌶")?;
    assert_eq!(memory.get_str("motd")?, "¡Hola, señor! 🌶");

    Ok(())
}

#[test]
fn test_oversized_string_is_rejected() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    let long = "x".repeat(nvs_kv::nvs::MAX_STR_LEN);
    assert!(matches!(
        memory.set_str("long", &long),
        Err(MemoryError::Store(StoreError::ValueTooLong { .. }))
    ));
    assert!(memory.get_str("long").is_err_and(|e| e.is_not_found()));

    Ok(())
}

// =============================================================================
// Closed State
// =============================================================================

#[test]
fn test_closed_facade_is_invalid_state() {
    let mut memory = Memory::new(MemoryNvs::new());

    assert!(memory.get_i32(COUNTER_KEY).is_err_and(|e| e.is_invalid_state()));
    assert!(memory.get_str(GREETING_KEY).is_err_and(|e| e.is_invalid_state()));
    assert!(memory.get_blob("raw").is_err_and(|e| e.is_invalid_state()));
    assert!(memory.set_i32(COUNTER_KEY, 1).is_err_and(|e| e.is_invalid_state()));
    assert!(memory.set_str(GREETING_KEY, "x").is_err_and(|e| e.is_invalid_state()));
    assert_eq!(memory.backend().stats().writes, 0);
}

#[test]
fn test_after_deinit_is_invalid_state() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    write_demo_values(&mut memory)?;

    memory.deinit()?;
    assert_eq!(memory.get_i32(COUNTER_KEY), Err(MemoryError::InvalidState));
    assert_eq!(
        memory.set_i32(COUNTER_KEY, 2),
        Err(MemoryError::InvalidState)
    );

    Ok(())
}

#[test]
fn test_deinit_twice() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    assert_eq!(memory.deinit(), Ok(()));
    assert_eq!(memory.deinit(), Ok(()));
    assert_eq!(memory.state(), MemoryState::Closed);

    Ok(())
}

#[test]
fn test_deinit_without_init() {
    let mut memory = Memory::new(MemoryNvs::new());
    assert_eq!(memory.deinit(), Ok(()));
    assert_eq!(memory.state(), MemoryState::Closed);
}

#[test]
fn test_reopen_sees_committed_values() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    write_demo_values(&mut memory)?;

    memory.deinit()?;
    memory.init()?;
    assert_eq!(memory.get_i32(COUNTER_KEY)?, COUNTER_VALUE);
    assert_eq!(memory.get_str(GREETING_KEY)?, GREETING_VALUE);

    Ok(())
}

// =============================================================================
// Blobs
// =============================================================================

#[test]
fn test_blob_set_is_not_supported() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    let err = memory.set("raw", &Value::Blob(vec![1, 2, 3]));
    assert!(err.is_err_and(|e| e.is_not_supported()));

    // Nothing reached the store
    let stats = memory.backend().stats();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.commits, 0);
    assert!(memory.get_blob("raw").is_err_and(|e| e.is_not_found()));

    Ok(())
}

#[test]
fn test_blob_set_is_not_supported_for_any_key() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    let blob = Value::Blob(vec![1, 2, 3]);
    let too_long = format!("{}x", LONGEST_KEY);

    assert!(memory.set("", &blob).is_err_and(|e| e.is_not_supported()));
    assert!(memory.set(&too_long, &blob).is_err_and(|e| e.is_not_supported()));
    assert!(memory
        .set_tagged(ValueType::Blob.tag(), "", &blob)
        .is_err_and(|e| e.is_not_supported()));

    let stats = memory.backend().stats();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.commits, 0);

    Ok(())
}

#[test]
fn test_blob_written_by_other_code_is_readable() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    let nvs = memory.backend_mut();
    let handle = nvs.open(nvs_kv::DEFAULT_NAMESPACE, OpenMode::ReadWrite)?;
    nvs.set_blob(handle, "cal", &[0xde, 0xad, 0xbe, 0xef])?;
    nvs.commit(handle)?;
    nvs.close(handle);

    assert_eq!(memory.get_blob("cal")?, vec![0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(memory.get_tagged(0, "cal")?.to_string(), "deadbeef");

    Ok(())
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_never_written_key_is_not_found() -> anyhow::Result<()> {
    let memory = open_memory()?;

    for ty in [ValueType::Int, ValueType::String, ValueType::Blob] {
        let err = memory.get(ty, "missing");
        assert_eq!(
            err,
            Err(MemoryError::Store(StoreError::NotFound("missing".to_string())))
        );
    }

    Ok(())
}

#[test]
fn test_allocation_failure_is_no_memory() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    write_demo_values(&mut memory)?;

    memory.backend_mut().report_next_size(usize::MAX);
    assert!(matches!(
        memory.get(ValueType::String, GREETING_KEY),
        Err(MemoryError::NoMemory { .. })
    ));

    Ok(())
}

#[test]
fn test_commit_failure_is_not_durable() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    memory
        .backend_mut()
        .fail_next_commit(StoreError::flash("write protect"));

    assert!(memory.set_i32(COUNTER_KEY, COUNTER_VALUE).is_err());

    // The value was written but not committed, so a reset loses it
    memory.backend_mut().power_cycle();
    memory.deinit()?;
    memory.init()?;
    assert!(memory.get_i32(COUNTER_KEY).is_err_and(|e| e.is_not_found()));

    Ok(())
}

#[test]
fn test_committed_values_survive_power_cycle() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    write_demo_values(&mut memory)?;

    memory.backend_mut().power_cycle();
    // The old handle is gone with the reset
    assert!(matches!(
        memory.get_i32(COUNTER_KEY),
        Err(MemoryError::Store(StoreError::NotInitialized))
    ));

    memory.deinit()?;
    memory.init()?;
    assert_eq!(memory.get_i32(COUNTER_KEY)?, COUNTER_VALUE);
    assert_eq!(memory.get_str(GREETING_KEY)?, GREETING_VALUE);

    Ok(())
}

// =============================================================================
// Init Recovery
// =============================================================================

#[test]
fn test_init_recovers_from_new_version() -> anyhow::Result<()> {
    let mut memory =
        memory_with_init_errors(vec![StoreError::NewVersionFound { found: 9, expected: 1 }]);

    memory.init()?;
    assert!(memory.is_open());
    assert_eq!(memory.backend().stats().erases, 1);

    // Usable after recovery
    memory.set_i32(COUNTER_KEY, COUNTER_VALUE)?;
    assert_eq!(memory.get_i32(COUNTER_KEY)?, COUNTER_VALUE);

    Ok(())
}

#[test]
fn test_init_recovery_failure_is_reported() {
    let mut memory =
        memory_with_init_errors(vec![StoreError::NoFreePages, StoreError::NoFreePages]);

    let err = memory.init();
    assert_eq!(err, Err(MemoryError::Store(StoreError::NoFreePages)));
    assert_eq!(memory.state(), MemoryState::Closed);
}

#[test]
fn test_init_erases_existing_data_on_recovery() -> anyhow::Result<()> {
    let mut memory = open_memory()?;
    write_demo_values(&mut memory)?;
    memory.deinit()?;

    memory
        .backend_mut()
        .queue_init_error(StoreError::NoFreePages);
    memory.init()?;
    assert!(memory.get_i32(COUNTER_KEY).is_err_and(|e| e.is_not_found()));

    Ok(())
}

// =============================================================================
// Raw Tags
// =============================================================================

#[test]
fn test_tagged_round_trip() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    memory.set_tagged(ValueType::Int.tag(), COUNTER_KEY, &Value::Int(COUNTER_VALUE))?;
    memory.set_tagged(ValueType::String.tag(), GREETING_KEY, &Value::from(GREETING_VALUE))?;

    assert_eq!(memory.get_tagged(2, COUNTER_KEY)?, Value::Int(COUNTER_VALUE));
    assert_eq!(memory.get_tagged(1, GREETING_KEY)?, Value::from(GREETING_VALUE));

    Ok(())
}

#[test]
fn test_unknown_tags() -> anyhow::Result<()> {
    let mut memory = open_memory()?;

    assert!(memory.get_tagged(3, COUNTER_KEY).is_err_and(|e| e.is_not_supported()));
    assert!(matches!(
        memory.set_tagged(3, COUNTER_KEY, &Value::Int(1)),
        Err(MemoryError::InvalidArgument(_))
    ));
    assert_eq!(memory.backend().stats().writes, 0);

    Ok(())
}
