//! Covenant protocol constants
//!
//! Byte sizes here are part of the commitment format. Changing any of them
//! changes every digest and every preimage.

/// SHA-256 class hash length
pub const HASH_SIZE: usize = 32;

/// RIPEMD-160 class hash length (default state digest width)
pub const SHORT_HASH_SIZE: usize = 20;

/// Serialized outpoint: txid (32) + output index (4, little-endian)
pub const OUTPOINT_SIZE: usize = HASH_SIZE + 4;

/// Amounts are always 8 bytes little-endian
pub const AMOUNT_SIZE: usize = 8;

/// Serialized transaction input in the tx wire format:
/// txid (32) + index (4) + spent script hash (32) + sequence (4)
pub const TX_INPUT_SIZE: usize = OUTPOINT_SIZE + HASH_SIZE + 4;

/// Serialized transaction output in the tx wire format:
/// amount (8) + script hash (32) + data hash (32)
pub const TX_OUTPUT_SIZE: usize = AMOUNT_SIZE + HASH_SIZE + HASH_SIZE;

/// Total size of a serialized context preimage
///
/// version(4) lock_time(4) six aggregate hashes (6 * 32) input_index(4)
/// outpoint(36) spent_script_hash(32) spent_amount(8) spent_data_hash(32)
/// sequence(4) sighash_type(4)
pub const CONTEXT_PREIMAGE_SIZE: usize =
    4 + 4 + 6 * HASH_SIZE + 4 + OUTPOINT_SIZE + HASH_SIZE + AMOUNT_SIZE + HASH_SIZE + 4 + 4;

/// Hard ceiling on flattened state leaves.
///
/// The verifier keeps one leaf hash per stack slot, so the leaf count must stay
/// well inside the VM operand limit (1000) together with the other operands.
pub const MAX_STATE_LEAVES: usize = 256;

/// Default flattened leaf capacity
pub const DEFAULT_MAX_STATE_LEAVES: usize = 64;

/// Maximum number of inputs in a transaction preimage
pub const MAX_INPUTS: usize = 1000;

/// Maximum number of outputs in a transaction preimage
pub const MAX_OUTPUTS: usize = 1000;

/// Default lazily-verified map depth (proof length in sibling hashes)
pub const DEFAULT_MAP_DEPTH: usize = 64;

/// Maximum lazily-verified map depth (bits of SHA-256)
pub const MAX_MAP_DEPTH: usize = 256;

/// Push-data opcodes used for length prefixes
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Sighash base types and modifier
pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Default transaction version for covenant spends
pub const DEFAULT_TX_VERSION: u32 = 2;

/// Final sequence number
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
