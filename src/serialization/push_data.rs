//! Length-prefixed byte stream elements
//!
//! Each element is a length header followed by the data:
//! - len < 0x4c: one length byte
//! - len <= 0xff: `0x4c` + 1 byte
//! - len <= 0xffff: `0x4d` + 2 bytes (little-endian)
//! - otherwise: `0x4e` + 4 bytes (little-endian)
//!
//! Headers must be minimal. A longer header than needed fails to decode.

use crate::constants::{OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};
use crate::error::{CovenantError, Result};
use std::borrow::Cow;

/// Length header for an element of `len` bytes
pub fn encode_push_header(len: usize) -> Vec<u8> {
    if len < OP_PUSHDATA1 as usize {
        vec![len as u8]
    } else if len <= 0xff {
        vec![OP_PUSHDATA1, len as u8]
    } else if len <= 0xffff {
        let mut header = vec![OP_PUSHDATA2];
        header.extend_from_slice(&(len as u16).to_le_bytes());
        header
    } else {
        let mut header = vec![OP_PUSHDATA4];
        header.extend_from_slice(&(len as u32).to_le_bytes());
        header
    }
}

/// Header followed by data
pub fn encode_push(data: &[u8]) -> Vec<u8> {
    let mut out = encode_push_header(data.len());
    out.extend_from_slice(data);
    out
}

/// Append a length-prefixed element to `out`
pub fn write_push(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&encode_push_header(data.len()));
    out.extend_from_slice(data);
}

/// Decode one length header
///
/// Returns `(data_len, header_len)`.
pub fn decode_push_header(bytes: &[u8]) -> Result<(usize, usize)> {
    let tag = *bytes
        .first()
        .ok_or_else(|| malformed(Cow::Borrowed("empty push header")))?;

    let (len, header_len, min) = match tag {
        t if t < OP_PUSHDATA1 => return Ok((t as usize, 1)),
        OP_PUSHDATA1 => {
            let b = field(bytes, 1)?;
            (b[0] as usize, 2, OP_PUSHDATA1 as usize)
        }
        OP_PUSHDATA2 => {
            let b = field(bytes, 2)?;
            (u16::from_le_bytes([b[0], b[1]]) as usize, 3, 0x100)
        }
        OP_PUSHDATA4 => {
            let b = field(bytes, 4)?;
            (
                u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize,
                5,
                0x1_0000,
            )
        }
        other => {
            return Err(malformed(Cow::Owned(format!(
                "invalid push header tag {other:#04x}"
            ))))
        }
    };

    if len < min {
        return Err(malformed(Cow::Owned(format!(
            "non-minimal push header {tag:#04x} for length {len}"
        ))));
    }

    Ok((len, header_len))
}

/// Decode one element
///
/// Returns the element data and the total number of bytes consumed.
pub fn decode_push(bytes: &[u8]) -> Result<(&[u8], usize)> {
    let (len, header_len) = decode_push_header(bytes)?;
    let end = header_len
        .checked_add(len)
        .ok_or_else(|| malformed(Cow::Borrowed("push length overflow")))?;
    let data = bytes.get(header_len..end).ok_or_else(|| {
        malformed(Cow::Owned(format!(
            "push declares {len} bytes, only {} available",
            bytes.len().saturating_sub(header_len)
        )))
    })?;
    Ok((data, end))
}

/// Split a stream into all of its elements; trailing garbage is an error
pub fn decode_push_stream(mut bytes: &[u8]) -> Result<Vec<&[u8]>> {
    let mut elements = Vec::new();
    while !bytes.is_empty() {
        let (data, consumed) = decode_push(bytes)?;
        elements.push(data);
        bytes = &bytes[consumed..];
    }
    Ok(elements)
}

fn field(bytes: &[u8], width: usize) -> Result<&[u8]> {
    bytes.get(1..1 + width).ok_or_else(|| {
        malformed(Cow::Owned(format!(
            "push header truncated: needs {} bytes, got {}",
            1 + width,
            bytes.len()
        )))
    })
}

fn malformed(reason: Cow<'static, str>) -> CovenantError {
    CovenantError::MalformedEncoding(reason)
}
