//! CompactSize VarInt encoding/decoding
//!
//! Used for the input and output counts of the transaction wire format.
//!
//! Encoding rules:
//! - If value < 0xfd: single byte
//! - If value <= 0xffff: 0xfd prefix + 2 bytes (little-endian)
//! - If value <= 0xffffffff: 0xfe prefix + 4 bytes (little-endian)
//! - Otherwise: 0xff prefix + 8 bytes (little-endian)
//!
//! Decoding rejects non-canonical encodings so that every count has exactly
//! one byte representation inside a hashed preimage.

use crate::error::{CovenantError, Result};
use std::borrow::Cow;

/// Encode a u64 value as a CompactSize VarInt
///
/// # Examples
///
/// ```
/// use blvm_covenant::serialization::varint::encode_varint;
///
/// assert_eq!(encode_varint(0), vec![0]);
/// assert_eq!(encode_varint(252), vec![252]);
/// assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
/// assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
/// ```
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = Vec::with_capacity(3);
        result.push(0xfd);
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffff_ffff {
        let mut result = Vec::with_capacity(5);
        result.push(0xfe);
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = Vec::with_capacity(9);
        result.push(0xff);
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Decode a CompactSize VarInt
///
/// Returns the decoded value and the number of bytes consumed.
///
/// ```
/// use blvm_covenant::serialization::varint::decode_varint;
///
/// assert_eq!(decode_varint(&[252]), Ok((252, 1)));
/// assert_eq!(decode_varint(&[0xfd, 253, 0]), Ok((253, 3)));
/// assert!(decode_varint(&[0xfd, 252, 0]).is_err());
/// ```
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let first_byte = *data.first().ok_or_else(|| insufficient(1, 0))?;

    let (width, min) = match first_byte {
        b if b < 0xfd => return Ok((b as u64, 1)),
        0xfd => (2usize, 0xfdu64),
        0xfe => (4, 0x1_0000),
        _ => (8, 0x1_0000_0000),
    };

    let body = data
        .get(1..1 + width)
        .ok_or_else(|| insufficient(1 + width, data.len()))?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(body);
    let value = u64::from_le_bytes(buf);

    if value < min {
        return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
            "non-canonical varint: {value} encoded with prefix {first_byte:#04x}"
        ))));
    }

    Ok((value, 1 + width))
}

fn insufficient(needed: usize, got: usize) -> CovenantError {
    CovenantError::MalformedEncoding(Cow::Owned(format!(
        "varint needs {needed} bytes, got {got}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_varint_boundaries() {
        assert_eq!(encode_varint(0xfc), vec![0xfc]);
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0]);
        assert_eq!(encode_varint(0xffff), vec![0xfd, 255, 255]);
        assert_eq!(encode_varint(0x10000), vec![0xfe, 0, 0, 1, 0]);
        assert_eq!(encode_varint(0xffff_ffff), vec![0xfe, 255, 255, 255, 255]);
        assert_eq!(
            encode_varint(0x1_0000_0000),
            vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_decode_varint_insufficient_bytes() {
        assert!(decode_varint(&[]).is_err());
        assert!(decode_varint(&[0xfd, 0]).is_err());
        assert!(decode_varint(&[0xfe, 0, 0, 0]).is_err());
        assert!(decode_varint(&[0xff, 0, 0, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_varint_non_canonical() {
        assert!(decode_varint(&[0xfd, 252, 0]).is_err());
        assert!(decode_varint(&[0xfe, 255, 255, 0, 0]).is_err());
        assert!(decode_varint(&[0xff, 255, 255, 255, 255, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_round_trip_boundaries() {
        for value in [0, 252, 253, 65535, 65536, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let encoded = encode_varint(value);
            assert_eq!(decode_varint(&encoded), Ok((value, encoded.len())));
        }
    }
}
