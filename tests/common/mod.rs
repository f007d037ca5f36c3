//! Shared builders for integration tests
//!
//! Builds the transactions a covenant spend involves and the context the
//! contract would receive for them.

#![allow(dead_code)]

use blvm_covenant::constants::{DEFAULT_MAX_STATE_LEAVES, SEQUENCE_FINAL};
use blvm_covenant::context::{AllContext, InputWitness, SighashMode};
use blvm_covenant::covenant::{ContractTemplate, CovenantInstance};
use blvm_covenant::schema::{FieldType, Schema, StructDef};
use blvm_covenant::serialization::TxPreimage;
use blvm_covenant::state::StructuredState;
use blvm_covenant::state_digest::StateSchema;
use blvm_covenant::transaction_hash::build_context_preimage;
use blvm_covenant::types::*;
use std::sync::Arc;

pub const COUNTER_SCRIPT: Hash = [0xc0; 32];
pub const FUNDING_SCRIPT: Hash = [0xf0; 32];

pub fn counter_schema() -> Arc<StateSchema> {
    let schema = Schema::new()
        .with_struct(StructDef::new("Counter").field("count", FieldType::Int))
        .with_state_type("Counter");
    Arc::new(StateSchema::new(schema, "Counter", DEFAULT_MAX_STATE_LEAVES).unwrap())
}

pub fn counter_state(count: i64) -> StructuredState {
    StructuredState::new().with("count", count)
}

pub fn counter_template() -> Arc<ContractTemplate> {
    Arc::new(ContractTemplate::new("Counter", COUNTER_SCRIPT))
}

pub fn input(prevout: Outpoint, spent_script_hash: Hash) -> TxInput {
    TxInput {
        prevout,
        spent_script_hash,
        sequence: SEQUENCE_FINAL,
    }
}

pub fn tx(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
    Transaction {
        version: 2,
        inputs,
        outputs,
        lock_time: 0,
    }
}

pub fn txid(tx: &Transaction) -> Hash {
    TxPreimage::from_transaction(tx).txid()
}

/// Deploy a counter: a funding tx whose output 0 carries `count`
pub fn deploy_counter(count: i64, amount: u64) -> (Transaction, CovenantInstance) {
    let mut instance = CovenantInstance::new(
        counter_template(),
        counter_schema(),
        counter_state(count),
        Network::Regtest,
    )
    .unwrap();
    let deploy = tx(
        vec![input(Outpoint::new([0xde; 32], 0), FUNDING_SCRIPT)],
        vec![instance.commitment_output(amount)],
    );
    instance
        .bind_to_utxo(Outpoint::new(txid(&deploy), 0), amount)
        .unwrap();
    (deploy, instance)
}

/// Spent outputs and witness for `spending`, given the txs that created its inputs
pub fn spent_outputs(spending: &Transaction, parents: &[&Transaction]) -> Vec<CommittedOutput> {
    spending
        .inputs
        .iter()
        .map(|input| {
            let parent = parents
                .iter()
                .find(|p| txid(p) == input.prevout.txid)
                .expect("parent supplied for every input");
            CommittedOutput::from(&parent.outputs[input.prevout.index as usize])
        })
        .collect()
}

pub fn witness(spending: &Transaction, spent: &[CommittedOutput]) -> InputWitness {
    InputWitness {
        prevouts: spending.inputs.iter().map(|i| i.prevout).collect(),
        spent_script_hashes: spent.iter().map(|o| o.script_hash).collect(),
        spent_amounts: spent.iter().map(|o| o.amount).collect(),
        spent_data_hashes: spent.iter().map(|o| o.data_hash).collect(),
        sequences: Some(spending.inputs.iter().map(|i| i.sequence).collect()),
    }
}

/// SIGHASH_ALL context for `spending.inputs[index]`
pub fn all_context(spending: &Transaction, spent: &[CommittedOutput], index: usize) -> AllContext {
    let preimage = build_context_preimage(spending, index, spent, SighashMode::ALL).unwrap();
    AllContext::parse(&preimage.to_bytes(), index as u32).unwrap()
}
