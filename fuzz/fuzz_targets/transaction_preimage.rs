#![no_main]
use blvm_covenant::backtrace::BacktraceProof;
use blvm_covenant::serialization::TxPreimage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(tx) = TxPreimage::parse(data) {
        // Round-trip property: serialize(parse(bytes)) = bytes
        assert_eq!(tx.to_bytes(), data, "accepted preimage must re-encode identically");
        let again = TxPreimage::parse(&tx.to_bytes()).map(|t| t.txid());
        assert_eq!(again.ok(), Some(tx.txid()));
    }

    // Proof construction parses exactly what TxPreimage::parse parses
    let proof = BacktraceProof::from_bytes(data, 0, None);
    assert_eq!(proof.is_ok(), TxPreimage::parse(data).is_ok());
});
