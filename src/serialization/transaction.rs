//! Transaction wire format
//!
//! The txid preimage is a fixed-width layout, so a contract can parse any
//! transaction it is handed and re-derive its id:
//! - Version (4 bytes, little-endian)
//! - Input count (VarInt)
//! - For each input (72 bytes):
//!   - Previous output txid (32 bytes)
//!   - Previous output index (4 bytes, little-endian)
//!   - Spent script hash (32 bytes)
//!   - Sequence (4 bytes, little-endian)
//! - Output count (VarInt)
//! - For each output (72 bytes):
//!   - Amount (8 bytes, little-endian)
//!   - Script hash (32 bytes)
//!   - Data hash (32 bytes)
//! - Lock time (4 bytes, little-endian)
//!
//! txid = SHA-256(SHA-256(serialized))

use super::reader::ByteReader;
use super::varint::encode_varint;
use crate::constants::{MAX_INPUTS, MAX_OUTPUTS, TX_INPUT_SIZE, TX_OUTPUT_SIZE};
use crate::crypto::hash256;
use crate::error::{CovenantError, Result};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Parsed txid preimage of a transaction
///
/// Unlike [`Transaction`] it only knows each output's data hash, which is all
/// a verifier ever sees of a prior transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPreimage {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<CommittedOutput>,
    pub lock_time: u32,
}

impl TxPreimage {
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            version: tx.version,
            inputs: tx.inputs.clone(),
            outputs: tx.outputs.iter().map(CommittedOutput::from).collect(),
            lock_time: tx.lock_time,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(
            4 + 9 + self.inputs.len() * TX_INPUT_SIZE + 9 + self.outputs.len() * TX_OUTPUT_SIZE + 4,
        );

        result.extend_from_slice(&self.version.to_le_bytes());

        result.extend_from_slice(&encode_varint(self.inputs.len() as u64));
        for input in &self.inputs {
            result.extend_from_slice(&input.prevout.to_bytes());
            result.extend_from_slice(&input.spent_script_hash);
            result.extend_from_slice(&input.sequence.to_le_bytes());
        }

        result.extend_from_slice(&encode_varint(self.outputs.len() as u64));
        for output in &self.outputs {
            result.extend_from_slice(&output.amount.to_le_bytes());
            result.extend_from_slice(&output.script_hash);
            result.extend_from_slice(&output.data_hash);
        }

        result.extend_from_slice(&self.lock_time.to_le_bytes());

        debug_assert_eq!(
            result.len(),
            4 + encode_varint(self.inputs.len() as u64).len()
                + self.inputs.len() * TX_INPUT_SIZE
                + encode_varint(self.outputs.len() as u64).len()
                + self.outputs.len() * TX_OUTPUT_SIZE
                + 4
        );

        result
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data, "tx preimage");

        let version = reader.u32_le()?;

        let input_count = reader.varint()?;
        if input_count as usize > MAX_INPUTS {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "tx preimage: {input_count} inputs exceed maximum {MAX_INPUTS}"
            ))));
        }
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let prevout = Outpoint::from_bytes(&reader.array::<36>()?);
            let spent_script_hash = reader.array::<32>()?;
            let sequence = reader.u32_le()?;
            inputs.push(TxInput {
                prevout,
                spent_script_hash,
                sequence,
            });
        }

        let output_count = reader.varint()?;
        if output_count as usize > MAX_OUTPUTS {
            return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
                "tx preimage: {output_count} outputs exceed maximum {MAX_OUTPUTS}"
            ))));
        }
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let amount = reader.u64_le()?;
            let script_hash = reader.array::<32>()?;
            let data_hash = reader.array::<32>()?;
            outputs.push(CommittedOutput {
                amount,
                script_hash,
                data_hash,
            });
        }

        let lock_time = reader.u32_le()?;
        reader.finish()?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Double SHA-256 of the serialized preimage
    pub fn txid(&self) -> Hash {
        hash256(&self.to_bytes())
    }
}

/// Serialize a transaction to the wire format
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    TxPreimage::from_transaction(tx).to_bytes()
}

/// Transaction id
pub fn calculate_txid(tx: &Transaction) -> Hash {
    TxPreimage::from_transaction(tx).txid()
}
