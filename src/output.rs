//! Output Builder
//!
//! Byte form of transaction outputs as hashed into `hash_outputs`:
//! - Amount (8 bytes, little-endian)
//! - Script hash (push-data element)
//! - State digest (push-data element, stateful outputs only)
//!
//! A contract builds the outputs it requires and compares their hash with the
//! context; anything the spender changes shows up as a mismatch.

use crate::constants::{AMOUNT_SIZE, HASH_SIZE};
use crate::context::{CommitsOutputs, Context, InputSelector};
use crate::crypto::sha256;
use crate::error::{CovenantError, Result};
use crate::serialization::push_data::{decode_push, write_push};
use crate::types::{Hash, TxOutput};
use std::borrow::Cow;
use tracing::debug;

/// Whether an output carries a state digest element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Plain,
    Stateful,
}

/// `amount ‖ push(script_hash)`
pub fn build_output(script_hash: &[u8], amount: &[u8]) -> Result<Vec<u8>> {
    if amount.len() != AMOUNT_SIZE {
        return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
            "amount must be {AMOUNT_SIZE} bytes, got {}",
            amount.len()
        ))));
    }
    let mut out = Vec::with_capacity(AMOUNT_SIZE + 1 + script_hash.len());
    out.extend_from_slice(amount);
    write_push(&mut out, script_hash);
    Ok(out)
}

/// `build_output(..) ‖ push(state_digest)`
///
/// An empty digest is rejected: it would commit the same data hash as a
/// plain output while serializing differently.
pub fn build_data_output(script_hash: &[u8], amount: &[u8], state_digest: &[u8]) -> Result<Vec<u8>> {
    if state_digest.is_empty() {
        return Err(CovenantError::MalformedEncoding(Cow::Borrowed(
            "state digest must not be empty",
        )));
    }
    let mut out = build_output(script_hash, amount)?;
    write_push(&mut out, state_digest);
    Ok(out)
}

impl TxOutput {
    pub fn kind(&self) -> OutputKind {
        match self.state_digest.as_deref() {
            Some(digest) if !digest.is_empty() => OutputKind::Stateful,
            _ => OutputKind::Plain,
        }
    }

    /// An empty digest serializes as a plain output, matching its data hash
    pub fn to_output_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AMOUNT_SIZE + 1 + HASH_SIZE);
        out.extend_from_slice(&self.amount.to_le_bytes());
        write_push(&mut out, &self.script_hash);
        if let Some(digest) = self.state_digest.as_deref().filter(|d| !d.is_empty()) {
            write_push(&mut out, digest);
        }
        out
    }
}

/// Concatenated output bytes, in transaction order
pub fn serialize_outputs(outputs: &[TxOutput]) -> Vec<u8> {
    outputs.iter().flat_map(TxOutput::to_output_bytes).collect()
}

/// SHA-256 over [`serialize_outputs`]
pub fn hash_outputs(outputs: &[TxOutput]) -> Hash {
    sha256(&serialize_outputs(outputs))
}

/// Parse one output of the given kind, returning it and the bytes consumed
pub fn parse_output(bytes: &[u8], kind: OutputKind) -> Result<(TxOutput, usize)> {
    let amount: [u8; AMOUNT_SIZE] = bytes
        .get(..AMOUNT_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(CovenantError::MalformedEncoding(Cow::Borrowed(
            "output: truncated amount",
        )))?;
    let mut offset = AMOUNT_SIZE;

    let (script_hash, consumed) = decode_push(&bytes[offset..])?;
    let script_hash: Hash = script_hash.try_into().map_err(|_| {
        CovenantError::MalformedEncoding(Cow::Owned(format!(
            "output: script hash must be {HASH_SIZE} bytes, got {}",
            script_hash.len()
        )))
    })?;
    offset += consumed;

    let state_digest = match kind {
        OutputKind::Plain => None,
        OutputKind::Stateful => {
            let (digest, consumed) = decode_push(&bytes[offset..])?;
            if digest.is_empty() {
                return Err(CovenantError::MalformedEncoding(Cow::Borrowed(
                    "output: empty state digest",
                )));
            }
            offset += consumed;
            Some(digest.to_vec())
        }
    };

    Ok((
        TxOutput {
            amount: u64::from_le_bytes(amount),
            script_hash,
            state_digest,
        },
        offset,
    ))
}

/// Inverse of [`serialize_outputs`] for a known output layout
///
/// Output boundaries are not self-delimiting (an amount can look like a
/// push header), so the caller states which outputs carry a digest.
pub fn parse_outputs(bytes: &[u8], layout: &[OutputKind]) -> Result<Vec<TxOutput>> {
    let mut outputs = Vec::with_capacity(layout.len());
    let mut offset = 0;
    for kind in layout {
        let (output, consumed) = parse_output(&bytes[offset..], *kind)?;
        outputs.push(output);
        offset += consumed;
    }
    if offset != bytes.len() {
        return Err(CovenantError::MalformedEncoding(Cow::Owned(format!(
            "outputs: {} trailing bytes",
            bytes.len() - offset
        ))));
    }
    Ok(outputs)
}

/// Check candidate output bytes against the context's `hash_outputs`
///
/// Only available for contexts whose mode commits outputs.
pub fn check_outputs<O: CommitsOutputs, I: InputSelector>(
    ctx: &Context<O, I>,
    candidate: &[u8],
) -> Result<()> {
    let actual = sha256(candidate);
    if actual != *ctx.hash_outputs() {
        debug!(
            expected = %hex::encode(ctx.hash_outputs()),
            actual = %hex::encode(actual),
            "hash_outputs mismatch"
        );
        return Err(CovenantError::ContextMismatch(Cow::Borrowed(
            "outputs do not match hash_outputs",
        )));
    }
    Ok(())
}
