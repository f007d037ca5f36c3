#![no_main]
use blvm_covenant::output::{parse_outputs, serialize_outputs, OutputKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte is the layout bitmap: bit i set means output i carries state
    let Some((&layout_bits, rest)) = data.split_first() else {
        return;
    };
    let count = (layout_bits >> 5) as usize;
    let layout: Vec<OutputKind> = (0..count)
        .map(|i| {
            if layout_bits & (1 << i) != 0 {
                OutputKind::Stateful
            } else {
                OutputKind::Plain
            }
        })
        .collect();

    if let Ok(outputs) = parse_outputs(rest, &layout) {
        assert_eq!(outputs.len(), layout.len());
        assert_eq!(serialize_outputs(&outputs), rest, "outputs must re-encode identically");
    }
});
