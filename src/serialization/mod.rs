//! Canonical serialization
//!
//! Every byte produced here ends up inside a hash commitment, so encodings
//! are deterministic and decoders reject every non-canonical form.
//!
//! All multi-byte integers are little-endian.

pub mod push_data;
pub mod reader;
pub mod script_num;
pub mod transaction;
pub mod value;
pub mod varint;

pub use push_data::{decode_push, decode_push_stream, encode_push, encode_push_header};
pub use script_num::{decode_int, encode_int};
pub use transaction::{calculate_txid, serialize_transaction, TxPreimage};
pub use value::{
    deserialize_record, deserialize_value, serialize_record, serialize_value, PrimitiveValue,
    ValueKind,
};
pub use varint::{decode_varint, encode_varint};
