//! Canonical encoding of primitive values and records
//!
//! Leaf values serialize without a length prefix. Records (and any other
//! variable-length stream) prefix each element with a push header.

use super::push_data::{decode_push, write_push};
use super::script_num::{decode_int, encode_int};
use crate::error::{CovenantError, Result};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Primitive value: arbitrary-precision integer, boolean or byte string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveValue {
    Int(BigInt),
    Bool(bool),
    Bytes(Vec<u8>),
}

/// Type tag of a primitive value, needed to decode (the empty string is
/// zero, false and the empty byte string at once)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Bool,
    Bytes,
}

impl PrimitiveValue {
    pub fn int(value: impl Into<BigInt>) -> Self {
        PrimitiveValue::Int(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        PrimitiveValue::Bytes(value.into())
    }

    /// Parse a hex byte string; odd-length or non-hex input fails
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() % 2 != 0 {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "odd-length byte string: {} hex digits",
                hex_str.len()
            ))));
        }
        hex::decode(hex_str)
            .map(PrimitiveValue::Bytes)
            .map_err(|e| CovenantError::MalformedEncoding(Cow::Owned(e.to_string())))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            PrimitiveValue::Int(_) => ValueKind::Int,
            PrimitiveValue::Bool(_) => ValueKind::Bool,
            PrimitiveValue::Bytes(_) => ValueKind::Bytes,
        }
    }
}

impl From<i64> for PrimitiveValue {
    fn from(value: i64) -> Self {
        PrimitiveValue::Int(BigInt::from(value))
    }
}

impl From<BigInt> for PrimitiveValue {
    fn from(value: BigInt) -> Self {
        PrimitiveValue::Int(value)
    }
}

impl From<bool> for PrimitiveValue {
    fn from(value: bool) -> Self {
        PrimitiveValue::Bool(value)
    }
}

impl From<Vec<u8>> for PrimitiveValue {
    fn from(value: Vec<u8>) -> Self {
        PrimitiveValue::Bytes(value)
    }
}

impl From<&[u8]> for PrimitiveValue {
    fn from(value: &[u8]) -> Self {
        PrimitiveValue::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for PrimitiveValue {
    fn from(value: [u8; N]) -> Self {
        PrimitiveValue::Bytes(value.to_vec())
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Int(v) => write!(f, "{v}n"),
            PrimitiveValue::Bool(v) => write!(f, "{v}"),
            PrimitiveValue::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
        }
    }
}

/// Serialize a leaf value (no length prefix)
pub fn serialize_value(value: &PrimitiveValue) -> Vec<u8> {
    match value {
        PrimitiveValue::Int(v) => encode_int(v),
        PrimitiveValue::Bool(true) => vec![0x01],
        PrimitiveValue::Bool(false) => Vec::new(),
        PrimitiveValue::Bytes(v) => v.clone(),
    }
}

/// Inverse of [`serialize_value`] for a known kind
pub fn deserialize_value(bytes: &[u8], kind: ValueKind) -> Result<PrimitiveValue> {
    match kind {
        ValueKind::Int => decode_int(bytes).map(PrimitiveValue::Int),
        ValueKind::Bool => match bytes {
            [] => Ok(PrimitiveValue::Bool(false)),
            [0x01] => Ok(PrimitiveValue::Bool(true)),
            other => Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "invalid boolean encoding: {}",
                hex::encode(other)
            )))),
        },
        ValueKind::Bytes => Ok(PrimitiveValue::Bytes(bytes.to_vec())),
    }
}

/// Serialize a record: every value as a length-prefixed element, in order
pub fn serialize_record(values: &[PrimitiveValue]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        write_push(&mut out, &serialize_value(value));
    }
    out
}

/// Inverse of [`serialize_record`]
///
/// The number of elements must match `kinds` exactly.
pub fn deserialize_record(bytes: &[u8], kinds: &[ValueKind]) -> Result<Vec<PrimitiveValue>> {
    let mut values = Vec::with_capacity(kinds.len());
    let mut rest = bytes;
    for (i, kind) in kinds.iter().enumerate() {
        if rest.is_empty() {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "record truncated: expected {} elements, got {i}",
                kinds.len()
            ))));
        }
        let (data, consumed) = decode_push(rest)?;
        values.push(deserialize_value(data, *kind)?);
        rest = &rest[consumed..];
    }
    if !rest.is_empty() {
        return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
            "{} trailing bytes after record",
            rest.len()
        ))));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_bool() {
        assert_eq!(serialize_value(&PrimitiveValue::Bool(false)), Vec::<u8>::new());
        assert_eq!(serialize_value(&PrimitiveValue::Bool(true)), vec![0x01]);
    }

    #[test]
    fn test_deserialize_bool_rejects_other_bytes() {
        assert!(deserialize_value(&[0x02], ValueKind::Bool).is_err());
        assert!(deserialize_value(&[0x01, 0x00], ValueKind::Bool).is_err());
    }

    #[test]
    fn test_bytes_serialize_as_is() {
        let v = PrimitiveValue::from_hex("deadbeef").unwrap();
        assert_eq!(serialize_value(&v), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_from_hex_rejects_odd_length() {
        assert!(PrimitiveValue::from_hex("abc").is_err());
        assert!(PrimitiveValue::from_hex("zz").is_err());
    }

    #[test]
    fn test_record_round_trip() {
        let values = vec![
            PrimitiveValue::from(0i64),
            PrimitiveValue::from(-129i64),
            PrimitiveValue::Bool(true),
            PrimitiveValue::bytes(vec![7u8; 80]),
        ];
        let kinds: Vec<_> = values.iter().map(|v| v.kind()).collect();
        let encoded = serialize_record(&values);
        assert_eq!(deserialize_record(&encoded, &kinds).unwrap(), values);
    }

    #[test]
    fn test_record_rejects_trailing_and_truncated() {
        let values = vec![PrimitiveValue::from(5i64)];
        let mut encoded = serialize_record(&values);
        assert!(deserialize_record(&encoded, &[ValueKind::Int, ValueKind::Int]).is_err());
        encoded.push(0x00);
        assert!(deserialize_record(&encoded, &[ValueKind::Int]).is_err());
    }
}
