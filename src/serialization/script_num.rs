//! Minimal sign-magnitude integer encoding
//!
//! Integers are little-endian magnitudes with the sign carried in the top bit
//! of the last byte. Zero is the empty byte string. When the magnitude already
//! uses the top bit, one extra byte (`0x00` or `0x80`) carries the sign.
//!
//! | value | bytes    |
//! |-------|----------|
//! | 0     | (empty)  |
//! | 1     | `01`     |
//! | -1    | `81`     |
//! | 127   | `7f`     |
//! | -127  | `ff`     |
//! | 128   | `8000`   |
//! | -129  | `8180`   |

use crate::error::{CovenantError, Result};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::borrow::Cow;

/// Encode an integer in minimal sign-magnitude form
pub fn encode_int(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }

    let (sign, mut bytes) = value.to_bytes_le();
    let negative = sign == Sign::Minus;

    // to_bytes_le yields a minimal magnitude, so the last byte is non-zero
    let last = *bytes.last().unwrap_or(&0);
    if last & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        if let Some(top) = bytes.last_mut() {
            *top |= 0x80;
        }
    }

    bytes
}

/// Decode a minimal sign-magnitude integer
///
/// Non-minimal encodings (trailing `00`/`80` that carries no information,
/// including negative zero) fail with `MalformedEncoding`, which keeps the
/// encoding injective.
pub fn decode_int(bytes: &[u8]) -> Result<BigInt> {
    let Some((&last, rest)) = bytes.split_last() else {
        return Ok(BigInt::zero());
    };

    if last & 0x7f == 0 {
        let sign_byte_needed = rest.last().map(|b| b & 0x80 != 0).unwrap_or(false);
        if !sign_byte_needed {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "non-minimal integer encoding: {}",
                hex::encode(bytes)
            ))));
        }
    }

    let negative = last & 0x80 != 0;
    let mut magnitude = bytes.to_vec();
    if let Some(top) = magnitude.last_mut() {
        *top &= 0x7f;
    }

    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_bytes_le(sign, &magnitude))
}

/// Encode a machine integer
pub fn encode_i64(value: i64) -> Vec<u8> {
    encode_int(&BigInt::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(v: i64) -> String {
        hex::encode(encode_i64(v))
    }

    #[test]
    fn test_encode_boundaries() {
        assert_eq!(enc(0), "");
        assert_eq!(enc(1), "01");
        assert_eq!(enc(-1), "81");
        assert_eq!(enc(127), "7f");
        assert_eq!(enc(-127), "ff");
        assert_eq!(enc(128), "8000");
        assert_eq!(enc(-128), "8080");
        assert_eq!(enc(-129), "8180");
        assert_eq!(enc(255), "ff00");
        assert_eq!(enc(256), "0001");
        assert_eq!(enc(32767), "ff7f");
        assert_eq!(enc(32768), "008000");
    }

    #[test]
    fn test_sign_only_in_top_bit() {
        let pos = encode_i64(127);
        let neg = encode_i64(-127);
        assert_eq!(pos.len(), neg.len());
        assert_eq!(pos[0] ^ neg[0], 0x80);
    }

    #[test]
    fn test_decode_round_trip() {
        for v in [0i64, -1, 1, 127, -127, 128, -129, 255, -255, 65535, i64::MAX, i64::MIN + 1] {
            assert_eq!(decode_int(&encode_i64(v)).unwrap(), BigInt::from(v));
        }
    }

    #[test]
    fn test_decode_big_value() {
        let big: BigInt = BigInt::from(u64::MAX) * BigInt::from(u64::MAX);
        let negative = -big.clone();
        assert_eq!(decode_int(&encode_int(&big)).unwrap(), big);
        assert_eq!(decode_int(&encode_int(&negative)).unwrap(), negative);
    }

    #[test]
    fn test_decode_rejects_non_minimal() {
        assert!(decode_int(&[0x00]).is_err());
        assert!(decode_int(&[0x80]).is_err());
        assert!(decode_int(&[0x01, 0x00]).is_err());
        assert!(decode_int(&[0x01, 0x80]).is_err());
        // 0x80 0x00 is minimal: the magnitude byte uses the top bit
        assert_eq!(decode_int(&[0x80, 0x00]).unwrap(), BigInt::from(128));
    }
}
