//! Context preimage production, parsing and input verification

mod common;

use blvm_covenant::context::*;
use blvm_covenant::transaction_hash::build_context_preimage;
use blvm_covenant::types::*;
use blvm_covenant::CovenantError;
use common::*;

fn two_input_spend() -> (Transaction, Vec<CommittedOutput>) {
    let (deploy, counter) = deploy_counter(0, 1_000);
    let fee_parent = tx(
        vec![input(Outpoint::new([0xfe; 32], 7), FUNDING_SCRIPT)],
        vec![TxOutput::new(50_000, FUNDING_SCRIPT)],
    );
    let next = counter.next(counter_state(1)).unwrap();
    let spending = tx(
        vec![
            input(counter.utxo().unwrap().outpoint, COUNTER_SCRIPT),
            input(Outpoint::new(txid(&fee_parent), 0), FUNDING_SCRIPT),
        ],
        vec![next.commitment_output(1_000), TxOutput::new(49_000, FUNDING_SCRIPT)],
    );
    let spent = spent_outputs(&spending, &[&deploy, &fee_parent]);
    (spending, spent)
}

#[test]
fn test_context_fields_reflect_transaction() {
    let (spending, spent) = two_input_spend();
    let ctx = all_context(&spending, &spent, 0);
    assert_eq!(ctx.version(), 2);
    assert_eq!(ctx.input_index(), 0);
    assert_eq!(ctx.outpoint(), &spending.inputs[0].prevout);
    assert_eq!(ctx.spent_script_hash(), &COUNTER_SCRIPT);
    assert_eq!(ctx.spent_amount(), 1_000);
    assert_eq!(ctx.spent_data_hash(), &spent[0].data_hash);
    assert_eq!(ctx.mode(), SighashMode::ALL);
}

#[test]
fn test_verify_inputs_for_each_input() {
    let (spending, spent) = two_input_spend();
    for index in 0..2 {
        let ctx = all_context(&spending, &spent, index);
        let verified = ctx.verify_inputs(&witness(&spending, &spent)).unwrap();
        assert_eq!(verified.input_index(), index);
        assert_eq!(verified.current_outpoint(), &spending.inputs[index].prevout);
        assert_eq!(verified.spent_amounts(), &[1_000, 50_000]);
    }
}

#[test]
fn test_lying_about_another_input_fails() {
    let (spending, spent) = two_input_spend();
    let ctx = all_context(&spending, &spent, 0);
    let mut forged = witness(&spending, &spent);
    forged.spent_script_hashes[1] = COUNTER_SCRIPT;
    assert!(matches!(
        ctx.verify_inputs(&forged),
        Err(CovenantError::ContextMismatch(_))
    ));
}

#[test]
fn test_anyonecanpay_zeroes_aggregates() {
    let (spending, spent) = two_input_spend();
    let preimage =
        build_context_preimage(&spending, 0, &spent, SighashMode::ALL_ANYONECANPAY).unwrap();
    assert_eq!(preimage.hash_prevouts, [0; 32]);
    assert_eq!(preimage.hash_spent_amounts, [0; 32]);
    assert_eq!(preimage.hash_sequences, [0; 32]);
    assert_ne!(preimage.hash_outputs, [0; 32]);

    let ctx = AllAnyoneCanPayContext::parse(&preimage.to_bytes(), 0).unwrap();
    assert_eq!(ctx.spent_amount(), 1_000);
    assert!(ctx.mode().check_access(ContextField::HashPrevouts).is_err());
}

#[test]
fn test_none_and_single_zero_rules() {
    let (spending, spent) = two_input_spend();
    let none = build_context_preimage(&spending, 1, &spent, SighashMode::NONE).unwrap();
    assert_eq!(none.hash_outputs, [0; 32]);
    assert_eq!(none.hash_sequences, [0; 32]);
    assert_ne!(none.hash_prevouts, [0; 32]);

    let single = build_context_preimage(&spending, 1, &spent, SighashMode::SINGLE).unwrap();
    assert_eq!(single.hash_sequences, [0; 32]);
    assert_eq!(
        single.hash_outputs,
        blvm_covenant::crypto::sha256(&spending.outputs[1].to_output_bytes())
    );

    let ctx = NoneContext::parse(&none.to_bytes(), 1).unwrap();
    let mut w = witness(&spending, &spent);
    w.sequences = None;
    assert!(ctx.verify_inputs(&w).is_ok());
}

#[test]
fn test_runtime_mode_gate() {
    let (spending, spent) = two_input_spend();
    let preimage = build_context_preimage(&spending, 0, &spent, SighashMode::SINGLE).unwrap();
    let parsed = ParsedContext::parse(&preimage.to_bytes(), 0).unwrap();
    assert!(matches!(
        parsed.clone().typed::<OutputsAll, InputsAll>(),
        Err(CovenantError::SighashModeViolation(_))
    ));
    assert!(matches!(
        parsed.clone().typed::<OutputsSingle, AnyoneCanPay>(),
        Err(CovenantError::SighashModeViolation(_))
    ));
    assert!(parsed.typed::<OutputsSingle, InputsAll>().is_ok());
}

#[test]
fn test_malformed_preimages() {
    let (spending, spent) = two_input_spend();
    let mut bytes = build_context_preimage(&spending, 0, &spent, SighashMode::ALL)
        .unwrap()
        .to_bytes();
    assert!(ParsedContext::parse(&bytes[..319], 0).is_err());

    let len = bytes.len();
    bytes[len - 4] = 0x05;
    assert!(matches!(
        ParsedContext::parse(&bytes, 0),
        Err(CovenantError::MalformedEncoding(_))
    ));
}
