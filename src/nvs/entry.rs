//! On-disk entry encoding for the fjall backend.
//!
//! Layout: `[kind tag: u8][payload][crc32 of tag + payload: u32 LE]`.
//! String payloads keep their trailing NUL so the stored size matches what a
//! size query reports.

use super::backend::EntryKind;
use super::error::StoreError;

const CRC_LEN: usize = 4;

/// Encode a payload of the given kind.
pub(crate) fn encode(kind: EntryKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len() + CRC_LEN);
    out.push(kind.tag());
    out.extend_from_slice(payload);
    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Decode an entry, verifying its checksum. `key` is only used for errors.
pub(crate) fn decode<'a>(key: &str, raw: &'a [u8]) -> Result<(EntryKind, &'a [u8]), StoreError> {
    let corrupted = || StoreError::Corrupted(key.to_string());

    let split = raw.len().checked_sub(CRC_LEN).ok_or_else(corrupted)?;
    let (body, crc_bytes) = raw.split_at_checked(split).ok_or_else(corrupted)?;
    let crc = u32::from_le_bytes(crc_bytes.try_into().map_err(|_| corrupted())?);
    if crc32fast::hash(body) != crc {
        return Err(corrupted());
    }

    let (tag, payload) = body.split_first().ok_or_else(corrupted)?;
    let kind = EntryKind::from_tag(*tag).ok_or_else(corrupted)?;
    Ok((kind, payload))
}
