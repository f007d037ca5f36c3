//! Backtrace Verifier
//!
//! Proves that the UTXO being spent descends from a known genesis: either its
//! creating transaction spent the genesis directly, or it spent an earlier
//! instance of the same covenant script (which by induction passed the same
//! check). A token minted through a separate minter contract needs one extra
//! hop, supplied as a second preimage.
//!
//! Proofs are checked against [`VerifiedInputs`], so the current outpoint and
//! spent script hash are facts already tied to the context.

use crate::context::VerifiedInputs;
use crate::error::{CovenantError, Result};
use crate::serialization::TxPreimage;
use crate::types::{Hash, Outpoint, TxInput};
use std::borrow::Cow;
use tracing::debug;

/// Caller-supplied ancestry of the current input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktraceProof {
    /// Transaction that created the output being spent
    pub prior_tx: TxPreimage,
    /// Input of `prior_tx` the lineage runs through
    pub prior_input_index: usize,
    /// Minter transaction that created the output `prior_input_index` spent
    pub second_hop: Option<SecondHop>,
}

/// Minter transaction plus the input of it that spent the genesis script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondHop {
    pub tx: TxPreimage,
    pub input_index: usize,
}

impl BacktraceProof {
    pub fn new(prior_tx: TxPreimage, prior_input_index: usize) -> Self {
        Self {
            prior_tx,
            prior_input_index,
            second_hop: None,
        }
    }

    pub fn with_second_hop(mut self, tx: TxPreimage, input_index: usize) -> Self {
        self.second_hop = Some(SecondHop { tx, input_index });
        self
    }

    /// Build from raw tx wire bytes
    pub fn from_bytes(
        prior_tx: &[u8],
        prior_input_index: usize,
        second_hop: Option<(&[u8], usize)>,
    ) -> Result<Self> {
        let second_hop = match second_hop {
            Some((bytes, input_index)) => Some(SecondHop {
                tx: TxPreimage::parse(bytes)?,
                input_index,
            }),
            None => None,
        };
        Ok(Self {
            prior_tx: TxPreimage::parse(prior_tx)?,
            prior_input_index,
            second_hop,
        })
    }
}

/// How the lineage reached its genesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BacktraceOrigin {
    /// The prior transaction spent the genesis directly
    Genesis,
    /// The prior transaction spent an earlier instance of this script
    Continuation,
    /// The prior transaction spent a minter output that spent the genesis
    Minted,
}

fn failed(reason: Cow<'static, str>) -> CovenantError {
    debug!(%reason, "backtrace failed");
    CovenantError::BacktraceFailed(reason)
}

/// Tie the prior transaction to the current outpoint; return the lineage input
fn bind_prior<'p>(proof: &'p BacktraceProof, inputs: &VerifiedInputs) -> Result<&'p TxInput> {
    let current = inputs.current_outpoint();
    let prior_txid = proof.prior_tx.txid();
    if prior_txid != current.txid {
        return Err(failed(Cow::Owned(format!(
            "prior tx {} does not create {current}",
            hex::encode(prior_txid)
        ))));
    }
    let output = proof
        .prior_tx
        .outputs
        .get(current.index as usize)
        .ok_or_else(|| failed(Cow::Owned(format!("prior tx has no output {}", current.index))))?;
    if output.script_hash != *inputs.current_spent_script_hash() {
        return Err(failed(Cow::Borrowed(
            "prior output script differs from spent script",
        )));
    }
    proof.prior_tx.inputs.get(proof.prior_input_index).ok_or_else(|| {
        failed(Cow::Owned(format!(
            "prior tx has no input {}",
            proof.prior_input_index
        )))
    })
}

/// Trace to a genesis identified by outpoint
pub fn verify_from_outpoint(
    proof: &BacktraceProof,
    genesis_outpoint: &Outpoint,
    inputs: &VerifiedInputs,
) -> Result<BacktraceOrigin> {
    let lineage = bind_prior(proof, inputs)?;
    if lineage.prevout == *genesis_outpoint {
        return Ok(BacktraceOrigin::Genesis);
    }
    if lineage.spent_script_hash == *inputs.current_spent_script_hash() {
        return Ok(BacktraceOrigin::Continuation);
    }
    Err(failed(Cow::Owned(format!(
        "lineage input spends {}, neither genesis nor this covenant",
        lineage.prevout
    ))))
}

/// Trace to a genesis identified by script hash
///
/// With `minter_script_hash` set, one hop through that minter is allowed:
/// the lineage input must spend a minter output, and the minter transaction's
/// designated input must spend the genesis script.
pub fn verify_from_script(
    proof: &BacktraceProof,
    genesis_script_hash: &Hash,
    minter_script_hash: Option<&Hash>,
    inputs: &VerifiedInputs,
) -> Result<BacktraceOrigin> {
    let lineage = bind_prior(proof, inputs)?;
    if lineage.spent_script_hash == *genesis_script_hash {
        return Ok(BacktraceOrigin::Genesis);
    }
    if lineage.spent_script_hash == *inputs.current_spent_script_hash() {
        return Ok(BacktraceOrigin::Continuation);
    }

    let minter_script_hash = minter_script_hash.ok_or_else(|| {
        failed(Cow::Borrowed(
            "lineage input is neither genesis nor this covenant and no minter is designated",
        ))
    })?;
    if lineage.spent_script_hash != *minter_script_hash {
        return Err(failed(Cow::Borrowed(
            "lineage input does not spend the designated minter",
        )));
    }
    let hop = proof.second_hop.as_ref().ok_or_else(|| {
        failed(Cow::Borrowed("lineage runs through the minter but no second hop given"))
    })?;
    if hop.tx.txid() != lineage.prevout.txid {
        return Err(failed(Cow::Borrowed(
            "second hop does not create the lineage input",
        )));
    }
    let minter_output = hop
        .tx
        .outputs
        .get(lineage.prevout.index as usize)
        .ok_or_else(|| failed(Cow::Borrowed("second hop lacks the lineage output")))?;
    if minter_output.script_hash != *minter_script_hash {
        return Err(failed(Cow::Borrowed(
            "second hop output is not locked by the minter",
        )));
    }
    let genesis_input = hop.tx.inputs.get(hop.input_index).ok_or_else(|| {
        failed(Cow::Owned(format!(
            "second hop has no input {}",
            hop.input_index
        )))
    })?;
    if genesis_input.spent_script_hash != *genesis_script_hash {
        return Err(failed(Cow::Borrowed("minter input does not spend the genesis script")));
    }
    Ok(BacktraceOrigin::Minted)
}
