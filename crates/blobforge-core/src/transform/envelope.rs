//! Text envelopes: base64, base32, and basE91.
//!
//! Every envelope renders bytes into an alphabet that drops into a C string
//! literal without escaping — no quotes, no backslashes, no control
//! characters. For basE91 that means one deviation from the standard table:
//! the trailing `"` is replaced by `-`. The decoders exist for the
//! invertibility tests; at runtime the inverse is the catalog's C template.

use crate::error::{Error, Result};

const BASE64_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Standard basE91 table with the final `"` swapped for `-`
const BASE91_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+,./:;<=>?@[]^_`{|}~-";

fn digit(alphabet: &[u8], envelope: &'static str, c: char) -> Result<u32> {
    alphabet
        .iter()
        .position(|&a| a as char == c)
        .map(|p| p as u32)
        .ok_or_else(|| {
            Error::malformed_stream(envelope, format!("character '{c}' not in alphabet"))
        })
}

pub(super) fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let mut buf = [0u8; 3];
        buf[..chunk.len()].copy_from_slice(chunk);
        let v = u32::from(buf[0]) << 16 | u32::from(buf[1]) << 8 | u32::from(buf[2]);
        let chars = chunk.len() + 1;
        for i in 0..4 {
            if i < chars {
                out.push(BASE64_ALPHABET[(v >> (18 - 6 * i) & 0x3F) as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

pub(super) fn base64_decode(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut acc: u32 = 0;
    let mut bits = 0u32;
    for c in text.chars() {
        if c == '=' {
            break;
        }
        acc = acc << 6 | digit(BASE64_ALPHABET, "base64", c)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

pub(super) fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    for chunk in data.chunks(5) {
        let mut buf = [0u8; 5];
        buf[..chunk.len()].copy_from_slice(chunk);
        let mut v: u64 = 0;
        for b in buf {
            v = v << 8 | u64::from(b);
        }
        let chars = match chunk.len() {
            1 => 2,
            2 => 4,
            3 => 5,
            4 => 7,
            _ => 8,
        };
        for i in 0..8 {
            if i < chars {
                out.push(BASE32_ALPHABET[(v >> (35 - 5 * i) & 0x1F) as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

pub(super) fn base32_decode(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut acc: u64 = 0;
    let mut bits = 0u32;
    for c in text.chars() {
        if c == '=' {
            break;
        }
        acc = acc << 5 | u64::from(digit(BASE32_ALPHABET, "base32", c)?);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }
    Ok(out)
}

pub(super) fn base91_encode(data: &[u8]) -> String {
    let mut out = String::new();
    let mut b: u32 = 0;
    let mut n = 0u32;
    for &byte in data {
        b |= u32::from(byte) << n;
        n += 8;
        if n > 13 {
            let mut v = b & 8191;
            if v > 88 {
                b >>= 13;
                n -= 13;
            } else {
                v = b & 16383;
                b >>= 14;
                n -= 14;
            }
            out.push(BASE91_ALPHABET[(v % 91) as usize] as char);
            out.push(BASE91_ALPHABET[(v / 91) as usize] as char);
        }
    }
    if n > 0 {
        out.push(BASE91_ALPHABET[(b % 91) as usize] as char);
        if n > 7 || b > 90 {
            out.push(BASE91_ALPHABET[(b / 91) as usize] as char);
        }
    }
    out
}

pub(super) fn base91_decode(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut v: i32 = -1;
    let mut b: u32 = 0;
    let mut n = 0u32;
    for c in text.chars() {
        let d = digit(BASE91_ALPHABET, "base91", c)?;
        if v < 0 {
            v = d as i32;
        } else {
            let val = v as u32 + d * 91;
            b |= val << n;
            n += if (val & 8191) > 88 { 13 } else { 14 };
            while n > 7 {
                out.push((b & 0xFF) as u8);
                b >>= 8;
                n -= 8;
            }
            v = -1;
        }
    }
    if v >= 0 {
        out.push(((b | (v as u32) << n) & 0xFF) as u8);
    }
    Ok(out)
}

/// True if every character can sit inside a C string literal unescaped
pub(crate) fn is_c_literal_safe(text: &str) -> bool {
    text.chars()
        .all(|c| (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base64_known_vectors() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"A"), "QQ==");
        assert_eq!(base64_encode(b"AB"), "QUI=");
        assert_eq!(base64_encode(b"ABC"), "QUJD");
        assert_eq!(base64_encode(b"ABCD"), "QUJDRA==");
    }

    #[test]
    fn test_base32_known_vectors() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"ABC"), "IFBEG===");
        assert_eq!(base32_encode(b"hello"), "NBSWY3DP");
    }

    #[test]
    fn test_base64_roundtrip_all_bytes() {
        let input: Vec<u8> = (0..=255).collect();
        assert_eq!(base64_decode(&base64_encode(&input)).unwrap(), input);
    }

    #[test]
    fn test_base32_roundtrip_all_bytes() {
        let input: Vec<u8> = (0..=255).collect();
        assert_eq!(base32_decode(&base32_encode(&input)).unwrap(), input);
    }

    #[test]
    fn test_base91_roundtrip() {
        for input in [
            &b""[..],
            &b"a"[..],
            &b"ab"[..],
            &b"abc"[..],
            &b"hello world"[..],
            &[0x00, 0xFF, 0x7F, 0x80][..],
        ] {
            assert_eq!(base91_decode(&base91_encode(input)).unwrap(), input.to_vec());
        }
        let input: Vec<u8> = (0..=255).cycle().take(1024).collect();
        assert_eq!(base91_decode(&base91_encode(&input)).unwrap(), input);
    }

    #[test]
    fn test_alphabet_safety() {
        let input: Vec<u8> = (0..=255).collect();
        for text in [
            base64_encode(&input),
            base32_encode(&input),
            base91_encode(&input),
        ] {
            assert!(is_c_literal_safe(&text), "unsafe char in: {text}");
        }
    }

    #[test]
    fn test_base91_alphabet_has_no_quote_or_backslash() {
        assert_eq!(BASE91_ALPHABET.len(), 91);
        assert!(!BASE91_ALPHABET.contains(&b'"'));
        assert!(!BASE91_ALPHABET.contains(&b'\\'));
        // no duplicate characters
        let mut sorted = BASE91_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 91);
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        assert!(base64_decode("QU\nJD").is_err());
        assert!(base32_decode("IFBEG\u{1}==").is_err());
        assert!(base91_decode("ab\"cd").is_err());
    }
}
