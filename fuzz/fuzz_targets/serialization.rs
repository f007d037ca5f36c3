#![no_main]
use blvm_covenant::serialization::{
    decode_int, decode_push, decode_varint, deserialize_record, encode_int, encode_push,
    encode_varint, serialize_record, ValueKind,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Accepted integers are minimal, so re-encoding reproduces the input
    if let Ok(v) = decode_int(data) {
        assert_eq!(encode_int(&v), data, "decoded int must re-encode identically");
    }

    if let Ok((v, consumed)) = decode_varint(data) {
        assert_eq!(encode_varint(v), &data[..consumed], "varint must be canonical");
    }

    if let Ok((payload, consumed)) = decode_push(data) {
        assert_eq!(encode_push(payload), &data[..consumed], "push header must be minimal");
    }

    // First byte picks a record layout, the rest is the record
    if let Some((&selector, rest)) = data.split_first() {
        let kinds: Vec<ValueKind> = (0..(selector % 6))
            .map(|i| match (selector >> (i % 4)) & 0x3 {
                0 => ValueKind::Int,
                1 => ValueKind::Bool,
                _ => ValueKind::Bytes,
            })
            .collect();
        if let Ok(values) = deserialize_record(rest, &kinds) {
            assert_eq!(serialize_record(&values), rest, "record must re-encode identically");
        }
    }
});
