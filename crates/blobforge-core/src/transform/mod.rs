//! Byte transform stages.
//!
//! Every compressor, encoder, and envelope the catalog can name maps onto a
//! built-in [`TransformKind`]. Catalog entries are pure data: they pick a
//! kind, optionally pin parameters (a fixed key, a round count), and carry
//! the C template that undoes the transform in the emitted code. The forward
//! direction runs here; the reverse implementations in this module exist so
//! tests can prove each stage invertible from its recorded metadata alone.
//!
//! ## Metadata contract
//!
//! Whatever a reverse step needs — key bytes, lengths, round counts — the
//! forward step records in [`Metadata`] under a stable name. Names never
//! collide across stages; a collision is a catalog-author error and aborts
//! the run.

mod compress;
mod encode;
mod envelope;

use crate::catalog::CatalogEntry;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metadata name for the pre-pipeline input length
pub const META_ORIGINAL_LEN: &str = "original_len";
/// Metadata name for the post-compression length
pub const META_COMPRESSED_LEN: &str = "compressed_len";
/// Metadata name for the post-encoding length (recorded when an envelope
/// re-renders the bytes as text)
pub const META_ENCODED_LEN: &str = "encoded_len";
/// Metadata name for the final artifact length
pub const META_PAYLOAD_LEN: &str = "payload_len";
/// Metadata name for encoder key bytes
pub const META_KEY: &str = "key";
/// Metadata name for the encoder key length
pub const META_KEY_LEN: &str = "key_len";
/// Metadata name for the ARX round count
pub const META_ROUNDS: &str = "rounds";

/// The fixed set of pipeline-produced metadata names a snippet template may
/// reference in addition to its own declared arguments.
pub const PIPELINE_META_NAMES: &[&str] = &[
    META_ORIGINAL_LEN,
    META_COMPRESSED_LEN,
    META_ENCODED_LEN,
    META_PAYLOAD_LEN,
    META_KEY,
    META_KEY_LEN,
    META_ROUNDS,
];

/// Built-in transform algorithms a catalog entry can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Pass-through; the reserved meaning of index 0
    None,
    /// Run-length coding as (count, byte) pairs
    Rle,
    /// Single-byte XOR
    Xor,
    /// Repeating multi-byte XOR key
    XorRolling,
    /// Add / rotate-left-3 / xor rounds over each byte
    Arx,
    /// RFC 4648 base64 text envelope
    Base64,
    /// RFC 4648 base32 text envelope
    Base32,
    /// basE91 text envelope (C-string-safe alphabet variant)
    Base91,
}

impl TransformKind {
    /// Returns the catalog spelling of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::None => "none",
            TransformKind::Rle => "rle",
            TransformKind::Xor => "xor",
            TransformKind::XorRolling => "xor_rolling",
            TransformKind::Arx => "arx",
            TransformKind::Base64 => "base64",
            TransformKind::Base32 => "base32",
            TransformKind::Base91 => "base91",
        }
    }

    /// True for kinds usable in the compressor category
    pub fn is_compressor(&self) -> bool {
        matches!(self, TransformKind::None | TransformKind::Rle)
    }

    /// True for kinds usable in the encoder category
    pub fn is_encoder(&self) -> bool {
        matches!(
            self,
            TransformKind::None | TransformKind::Xor | TransformKind::XorRolling | TransformKind::Arx
        )
    }

    /// True for kinds usable in the envelope category
    pub fn is_envelope(&self) -> bool {
        matches!(
            self,
            TransformKind::None | TransformKind::Base64 | TransformKind::Base32 | TransformKind::Base91
        )
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single metadata value recorded by a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// Scalar recorded as a numeric constant in the emitted source
    Int(u64),
    /// Byte string recorded as a named array in the emitted source
    Bytes(Vec<u8>),
}

impl MetaValue {
    /// Returns the scalar value, if this is one
    pub fn as_int(&self) -> Option<u64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            MetaValue::Bytes(_) => None,
        }
    }

    /// Returns the byte string, if this is one
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MetaValue::Int(_) => None,
            MetaValue::Bytes(b) => Some(b),
        }
    }
}

/// Insertion-ordered, collision-checked metadata mapping.
///
/// Built incrementally by the executor and the stages it runs; consumed by
/// the renderer and by the test-side reverse implementations.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    /// Creates an empty metadata mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value under a stable name.
    ///
    /// A repeated name means two stages disagree about who owns it, which is
    /// a catalog-author error.
    pub fn insert(&mut self, name: &str, value: MetaValue) -> Result<()> {
        if self.get(name).is_some() {
            return Err(Error::catalog_format(format!(
                "metadata name '{name}' recorded by more than one stage"
            )));
        }
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    /// Looks up a value by name
    pub fn get(&self, name: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Looks up a scalar by name
    pub fn get_int(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(MetaValue::as_int)
    }

    /// Looks up a byte string by name
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(MetaValue::as_bytes)
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The byte buffer at a pipeline stage boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Raw bytes (no envelope, or pre-envelope)
    Bytes(Vec<u8>),
    /// Printable text produced by a non-identity envelope
    Text(String),
}

impl Artifact {
    /// Length of the artifact in bytes (text length for text artifacts)
    pub fn len(&self) -> usize {
        match self {
            Artifact::Bytes(b) => b.len(),
            Artifact::Text(t) => t.len(),
        }
    }

    /// True for a zero-length artifact
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if this artifact is envelope-rendered text
    pub fn is_text(&self) -> bool {
        matches!(self, Artifact::Text(_))
    }
}

/// Runs a compressor entry's forward transform
pub fn forward_compress(entry: &CatalogEntry, data: &[u8], meta: &mut Metadata) -> Result<Vec<u8>> {
    match entry.kind {
        TransformKind::None => Ok(data.to_vec()),
        TransformKind::Rle => compress::rle_forward(data, meta),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not a compressor",
            entry.name
        ))),
    }
}

/// Reverses a compressor transform using its recorded metadata
pub fn reverse_compress(entry: &CatalogEntry, data: &[u8], meta: &Metadata) -> Result<Vec<u8>> {
    match entry.kind {
        TransformKind::None => Ok(data.to_vec()),
        TransformKind::Rle => compress::rle_reverse(data, meta),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not a compressor",
            entry.name
        ))),
    }
}

/// Runs an encoder entry's forward transform
pub fn forward_encode(entry: &CatalogEntry, data: &[u8], meta: &mut Metadata) -> Result<Vec<u8>> {
    match entry.kind {
        TransformKind::None => Ok(data.to_vec()),
        TransformKind::Xor => encode::xor_forward(entry, data, meta),
        TransformKind::XorRolling => encode::xor_rolling_forward(entry, data, meta),
        TransformKind::Arx => encode::arx_forward(entry, data, meta),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not an encoder",
            entry.name
        ))),
    }
}

/// Reverses an encoder transform using its recorded metadata
pub fn reverse_encode(entry: &CatalogEntry, data: &[u8], meta: &Metadata) -> Result<Vec<u8>> {
    match entry.kind {
        TransformKind::None => Ok(data.to_vec()),
        TransformKind::Xor | TransformKind::XorRolling => encode::xor_reverse(data, meta),
        TransformKind::Arx => encode::arx_reverse(data, meta),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not an encoder",
            entry.name
        ))),
    }
}

/// Runs an envelope entry's forward transform.
///
/// Returns `None` for the identity envelope: the artifact stays a raw byte
/// buffer and is emitted as an array literal.
pub fn forward_envelope(entry: &CatalogEntry, data: &[u8]) -> Result<Option<String>> {
    match entry.kind {
        TransformKind::None => Ok(None),
        TransformKind::Base64 => Ok(Some(envelope::base64_encode(data))),
        TransformKind::Base32 => Ok(Some(envelope::base32_encode(data))),
        TransformKind::Base91 => Ok(Some(envelope::base91_encode(data))),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not an envelope",
            entry.name
        ))),
    }
}

/// Decodes an envelope's text rendering back into bytes
pub fn decode_envelope(entry: &CatalogEntry, text: &str) -> Result<Vec<u8>> {
    match entry.kind {
        TransformKind::None => Ok(text.as_bytes().to_vec()),
        TransformKind::Base64 => envelope::base64_decode(text),
        TransformKind::Base32 => envelope::base32_decode(text),
        TransformKind::Base91 => envelope::base91_decode(text),
        other => Err(Error::catalog_format(format!(
            "entry '{}' binds kind '{other}' which is not an envelope",
            entry.name
        ))),
    }
}

/// Parses an optional numeric entry parameter, with bounds
pub(crate) fn param_u32(
    entry: &CatalogEntry,
    name: &str,
    default: u32,
    min: u32,
    max: u32,
) -> Result<u32> {
    let Some(raw) = entry.params.get(name) else {
        return Ok(default);
    };
    let value: u32 = raw
        .parse()
        .map_err(|_| Error::bad_param(&entry.name, name, format!("'{raw}' is not an integer")))?;
    if value < min || value > max {
        return Err(Error::bad_param(
            &entry.name,
            name,
            format!("{value} out of range {min}..={max}"),
        ));
    }
    Ok(value)
}

/// Parses an optional hex key parameter (`0x5A` or bare hex digits)
pub(crate) fn param_key(entry: &CatalogEntry, name: &str) -> Result<Option<Vec<u8>>> {
    let Some(raw) = entry.params.get(name) else {
        return Ok(None);
    };
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() || digits.len() % 2 != 0 || !digits.is_ascii() {
        return Err(Error::bad_param(
            &entry.name,
            name,
            format!("'{raw}' is not an even-length hex string"),
        ));
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for i in (0..digits.len()).step_by(2) {
        let pair = &digits[i..i + 2];
        let byte = u8::from_str_radix(pair, 16)
            .map_err(|_| Error::bad_param(&entry.name, name, format!("'{pair}' is not hex")))?;
        bytes.push(byte);
    }
    Ok(Some(bytes))
}
