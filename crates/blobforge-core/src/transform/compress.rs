//! Run-length compressor.
//!
//! The stream is a flat sequence of (count, byte) pairs with counts in
//! 1..=255. Runs compress well; incompressible input doubles in size, which
//! is acceptable for short payloads and keeps the C-side decoder trivial.

use super::{MetaValue, Metadata, META_COMPRESSED_LEN};
use crate::error::{Error, Result};

pub(super) fn rle_forward(data: &[u8], meta: &mut Metadata) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut iter = data.iter().copied().peekable();

    while let Some(byte) = iter.next() {
        let mut count: u8 = 1;
        while count < u8::MAX && iter.peek() == Some(&byte) {
            iter.next();
            count += 1;
        }
        out.push(count);
        out.push(byte);
    }

    meta.insert(META_COMPRESSED_LEN, MetaValue::Int(out.len() as u64))?;
    Ok(out)
}

pub(super) fn rle_reverse(data: &[u8], _meta: &Metadata) -> Result<Vec<u8>> {
    if data.len() % 2 != 0 {
        return Err(Error::malformed_stream("rle", "odd-length pair stream"));
    }

    let mut out = Vec::new();
    for pair in data.chunks_exact(2) {
        let (count, byte) = (pair[0], pair[1]);
        if count == 0 {
            return Err(Error::malformed_stream("rle", "zero run count"));
        }
        out.extend(std::iter::repeat(byte).take(count as usize));
    }
    Ok(out)
}
