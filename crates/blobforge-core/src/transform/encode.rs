//! Keyed encoders: XOR-family and the add-rotate-xor round cipher.
//!
//! Keys are taken from the entry's `params.key` when the catalog pins one,
//! otherwise derived deterministically from the blake3 hash of the stage
//! input. Either way the key lands in metadata, so the emitted reverse code
//! never needs a side channel. Zero-length input maps to zero-length output
//! with no key recorded at all.

use super::{
    param_key, param_u32, MetaValue, Metadata, META_KEY, META_KEY_LEN, META_ROUNDS,
};
use crate::catalog::CatalogEntry;
use crate::error::{Error, Result};

/// Default rolling-key length when the catalog does not pin one
const DEFAULT_ROLLING_KEY_LEN: u32 = 8;

/// Default ARX round count
const DEFAULT_ARX_ROUNDS: u32 = 4;

/// ARX rotate distance; the inverse in the C templates mirrors this
const ARX_ROT: u32 = 3;

/// Derives `len` key bytes from the input. A derived key of all zeroes
/// would turn the XOR family into identity, so the first byte gets a fixed
/// fallback in that case.
fn derive_key(data: &[u8], len: usize) -> Vec<u8> {
    debug_assert!(len >= 1 && len <= blake3::OUT_LEN);
    let hash = blake3::hash(data);
    let mut key = hash.as_bytes()[..len].to_vec();
    if key.iter().all(|&b| b == 0) {
        key[0] = 0xA5;
    }
    key
}

fn resolve_key(entry: &CatalogEntry, data: &[u8], len: usize) -> Result<Vec<u8>> {
    match param_key(entry, "key")? {
        Some(key) => Ok(key),
        None => Ok(derive_key(data, len)),
    }
}

fn record_key(meta: &mut Metadata, key: &[u8]) -> Result<()> {
    meta.insert(META_KEY, MetaValue::Bytes(key.to_vec()))?;
    meta.insert(META_KEY_LEN, MetaValue::Int(key.len() as u64))
}

fn key_from_meta(meta: &Metadata) -> Result<Vec<u8>> {
    meta.get_bytes(META_KEY)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::malformed_stream("encoder", "no key recorded in metadata"))
}

pub(super) fn xor_forward(entry: &CatalogEntry, data: &[u8], meta: &mut Metadata) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let key = resolve_key(entry, data, 1)?;
    if key.len() != 1 {
        return Err(Error::bad_param(
            &entry.name,
            "key",
            format!("single-byte xor needs a 1-byte key, got {}", key.len()),
        ));
    }
    record_key(meta, &key)?;
    Ok(data.iter().map(|b| b ^ key[0]).collect())
}

pub(super) fn xor_rolling_forward(
    entry: &CatalogEntry,
    data: &[u8],
    meta: &mut Metadata,
) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let key_len = param_u32(entry, "key_len", DEFAULT_ROLLING_KEY_LEN, 1, 32)?;
    let key = resolve_key(entry, data, key_len as usize)?;
    record_key(meta, &key)?;
    Ok(data
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect())
}

/// XOR is its own inverse, so one reverse covers both XOR kinds
pub(super) fn xor_reverse(data: &[u8], meta: &Metadata) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let key = key_from_meta(meta)?;
    Ok(data
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect())
}

pub(super) fn arx_forward(entry: &CatalogEntry, data: &[u8], meta: &mut Metadata) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let rounds = param_u32(entry, "rounds", DEFAULT_ARX_ROUNDS, 1, 16)?;
    let key = resolve_key(entry, data, 2)?;
    if key.len() != 2 {
        return Err(Error::bad_param(
            &entry.name,
            "key",
            format!("arx needs a 2-byte key (add, xor), got {}", key.len()),
        ));
    }
    record_key(meta, &key)?;
    meta.insert(META_ROUNDS, MetaValue::Int(rounds as u64))?;

    let mut out = data.to_vec();
    for _ in 0..rounds {
        for b in &mut out {
            *b = b.wrapping_add(key[0]).rotate_left(ARX_ROT) ^ key[1];
        }
    }
    Ok(out)
}

pub(super) fn arx_reverse(data: &[u8], meta: &Metadata) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let key = key_from_meta(meta)?;
    if key.len() != 2 {
        return Err(Error::malformed_stream("arx", "recorded key is not 2 bytes"));
    }
    let rounds = meta
        .get_int(META_ROUNDS)
        .ok_or_else(|| Error::malformed_stream("arx", "no round count recorded"))?;

    let mut out = data.to_vec();
    for _ in 0..rounds {
        for b in &mut out {
            *b = (*b ^ key[1]).rotate_right(ARX_ROT).wrapping_sub(key[0]);
        }
    }
    Ok(out)
}
