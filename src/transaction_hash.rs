//! Context preimage construction for signing
//!
//! Producer side of [`crate::context`]: given a transaction, the outputs its
//! inputs spend and a sighash mode, build the exact preimage a contract will
//! later parse. The signature commits to the double SHA-256 of those bytes.

use crate::context::{
    hash_amounts, hash_hashes, hash_prevouts, hash_sequences, ContextPreimage, OutputMode,
    SighashMode,
};
use crate::crypto::{hash256, sha256};
use crate::error::{CovenantError, Result};
use crate::output::hash_outputs;
use crate::types::*;
use std::borrow::Cow;

pub use crate::serialization::transaction::calculate_txid;

/// Build the context preimage for `tx.inputs[input_index]`
///
/// `spent_outputs[i]` is the output consumed by `tx.inputs[i]`.
pub fn build_context_preimage(
    tx: &Transaction,
    input_index: usize,
    spent_outputs: &[CommittedOutput],
    mode: SighashMode,
) -> Result<ContextPreimage> {
    if input_index >= tx.inputs.len() {
        return Err(CovenantError::ContextMismatch(Cow::Owned(format!(
            "input index {input_index} out of range for {} inputs",
            tx.inputs.len()
        ))));
    }
    if spent_outputs.len() != tx.inputs.len() {
        return Err(CovenantError::ContextMismatch(Cow::Owned(format!(
            "{} spent outputs supplied for {} inputs",
            spent_outputs.len(),
            tx.inputs.len()
        ))));
    }
    if let Some(i) = tx
        .inputs
        .iter()
        .zip(spent_outputs)
        .position(|(input, spent)| input.spent_script_hash != spent.script_hash)
    {
        return Err(CovenantError::ContextMismatch(Cow::Owned(format!(
            "input {i} spends a different script than supplied"
        ))));
    }

    let zero = [0u8; 32];
    let (prevouts_hash, scripts_hash, amounts_hash, data_hash) = if mode.commits_input_set() {
        let prevouts: Vec<Outpoint> = tx.inputs.iter().map(|i| i.prevout).collect();
        let scripts: Vec<Hash> = spent_outputs.iter().map(|o| o.script_hash).collect();
        let amounts: Vec<u64> = spent_outputs.iter().map(|o| o.amount).collect();
        let data: Vec<Hash> = spent_outputs.iter().map(|o| o.data_hash).collect();
        (
            hash_prevouts(&prevouts),
            hash_hashes(&scripts),
            hash_amounts(&amounts),
            hash_hashes(&data),
        )
    } else {
        (zero, zero, zero, zero)
    };

    let sequences_hash = if mode.commits_sequences() {
        let sequences: Vec<u32> = tx.inputs.iter().map(|i| i.sequence).collect();
        hash_sequences(&sequences)
    } else {
        zero
    };

    let outputs_hash = match mode.outputs {
        OutputMode::All => hash_outputs(&tx.outputs),
        OutputMode::None => zero,
        OutputMode::Single => match tx.outputs.get(input_index) {
            Some(output) => sha256(&output.to_output_bytes()),
            None => zero,
        },
    };

    let input = &tx.inputs[input_index];
    let spent = &spent_outputs[input_index];
    Ok(ContextPreimage {
        version: tx.version,
        lock_time: tx.lock_time,
        hash_prevouts: prevouts_hash,
        hash_spent_script_hashes: scripts_hash,
        hash_spent_amounts: amounts_hash,
        hash_spent_data_hashes: data_hash,
        hash_sequences: sequences_hash,
        hash_outputs: outputs_hash,
        input_index: input_index as u32,
        outpoint: input.prevout,
        spent_script_hash: spent.script_hash,
        spent_amount: spent.amount,
        spent_data_hash: spent.data_hash,
        sequence: input.sequence,
        sighash_type: mode.to_u32(),
    })
}

/// Hash a signature over this input commits to
pub fn calculate_context_sighash(
    tx: &Transaction,
    input_index: usize,
    spent_outputs: &[CommittedOutput],
    mode: SighashMode,
) -> Result<Hash> {
    let preimage = build_context_preimage(tx, input_index, spent_outputs, mode)?;
    Ok(hash256(&preimage.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AllContext, ParsedContext, SingleContext};
    use crate::output::check_outputs;

    fn spend() -> (Transaction, Vec<CommittedOutput>) {
        let spent = vec![
            CommittedOutput::from(&TxOutput::with_state_digest(1, [9; 32], &[1; 20])),
            CommittedOutput::from(&TxOutput::new(5000, [8; 32])),
        ];
        let tx = Transaction {
            version: 2,
            inputs: vec![
                TxInput {
                    prevout: Outpoint::new([1; 32], 0),
                    spent_script_hash: [9; 32],
                    sequence: 0xffff_ffff,
                },
                TxInput {
                    prevout: Outpoint::new([2; 32], 3),
                    spent_script_hash: [8; 32],
                    sequence: 0xffff_ffff,
                },
            ],
            outputs: vec![TxOutput::with_state_digest(1, [9; 32], &[2; 20])],
            lock_time: 0,
        };
        (tx, spent)
    }

    #[test]
    fn test_preimage_parses_back_for_every_mode() {
        let (tx, spent) = spend();
        for mode in [
            SighashMode::ALL,
            SighashMode::NONE,
            SighashMode::SINGLE,
            SighashMode::ALL_ANYONECANPAY,
            SighashMode::NONE_ANYONECANPAY,
            SighashMode::SINGLE_ANYONECANPAY,
        ] {
            let preimage = build_context_preimage(&tx, 0, &spent, mode).unwrap();
            let parsed = ParsedContext::parse(&preimage.to_bytes(), 0).unwrap();
            assert_eq!(parsed.mode(), mode);
        }
    }

    #[test]
    fn test_outputs_check_against_own_preimage() {
        let (tx, spent) = spend();
        let preimage = build_context_preimage(&tx, 0, &spent, SighashMode::ALL).unwrap();
        let ctx = AllContext::parse(&preimage.to_bytes(), 0).unwrap();
        check_outputs(&ctx, &tx.outputs[0].to_output_bytes()).unwrap();
    }

    #[test]
    fn test_single_without_matching_output_is_zero() {
        let (tx, spent) = spend();
        let preimage = build_context_preimage(&tx, 1, &spent, SighashMode::SINGLE).unwrap();
        assert_eq!(preimage.hash_outputs, [0; 32]);
        let ctx = SingleContext::parse(&preimage.to_bytes(), 1).unwrap();
        assert!(check_outputs(&ctx, &[]).is_err());
    }

    #[test]
    fn test_rejects_inconsistent_inputs() {
        let (tx, mut spent) = spend();
        assert!(build_context_preimage(&tx, 2, &spent, SighashMode::ALL).is_err());
        spent[1].script_hash = [0; 32];
        assert!(build_context_preimage(&tx, 0, &spent, SighashMode::ALL).is_err());
        spent.pop();
        assert!(build_context_preimage(&tx, 0, &spent, SighashMode::ALL).is_err());
    }

    #[test]
    fn test_sighash_depends_on_mode() {
        let (tx, spent) = spend();
        let all = calculate_context_sighash(&tx, 0, &spent, SighashMode::ALL).unwrap();
        let none = calculate_context_sighash(&tx, 0, &spent, SighashMode::NONE).unwrap();
        assert_ne!(all, none);
    }
}
