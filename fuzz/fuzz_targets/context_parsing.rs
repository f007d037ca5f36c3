#![no_main]
use blvm_covenant::context::{
    AllContext, ContextPreimage, NoneAnyoneCanPayContext, ParsedContext, SingleContext,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (index_bytes, preimage) = data.split_at(4);
    let input_index = u32::from_le_bytes([index_bytes[0], index_bytes[1], index_bytes[2], index_bytes[3]]);

    if let Ok(parsed) = ParsedContext::parse(preimage, input_index) {
        // Everything a parse accepts is a faithful decoding of the bytes
        assert_eq!(parsed.to_bytes(), preimage);
        assert_eq!(parsed.input_index(), input_index);
        let mode = parsed.mode();

        // Exactly the matching typed view accepts it
        let typed_ok = [
            AllContext::parse(preimage, input_index).is_ok(),
            SingleContext::parse(preimage, input_index).is_ok(),
            NoneAnyoneCanPayContext::parse(preimage, input_index).is_ok(),
        ];
        let expected = [
            mode == blvm_covenant::context::SighashMode::ALL,
            mode == blvm_covenant::context::SighashMode::SINGLE,
            mode == blvm_covenant::context::SighashMode::NONE_ANYONECANPAY,
        ];
        assert_eq!(typed_ok, expected);
    }

    if let Ok(raw) = ContextPreimage::decode(preimage) {
        assert_eq!(raw.to_bytes(), preimage);
    }
});
