use blvm_covenant::crypto::DigestAlgorithm;
use blvm_covenant::schema::{FieldType, Schema, StructDef};
use blvm_covenant::state::StructuredState;
use blvm_covenant::state_digest::{StateDigestEngine, StateSchema};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Flat schema of `n` int fields plus its state
fn flat(n: usize) -> (StateSchema, StructuredState) {
    let mut def = StructDef::new("Flat");
    let mut state = StructuredState::new();
    for i in 0..n {
        def = def.field(format!("f{i}"), FieldType::Int);
        state = state.with(format!("f{i}"), i as i64 * 1_000_003);
    }
    let schema = StateSchema::new(Schema::new().with_struct(def), "Flat", 256)
        .unwrap_or_else(|e| panic!("bench schema: {e}"));
    (schema, state)
}

fn benchmark_digest_by_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_digest");
    for algorithm in [DigestAlgorithm::Hash160, DigestAlgorithm::Sha256] {
        let engine = StateDigestEngine::new(algorithm, 256);
        for n in [1usize, 8, 64, 256] {
            let (schema, state) = flat(n);
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), n),
                &n,
                |b, _| b.iter(|| black_box(engine.digest(&schema, black_box(&state)))),
            );
        }
    }
    group.finish();
}

fn benchmark_nested_digest(c: &mut Criterion) {
    let schema = Schema::new()
        .with_struct(
            StructDef::new("Holder")
                .field("owner", FieldType::Bytes)
                .field("balance", FieldType::Int),
        )
        .with_struct(StructDef::new("Ledger").field(
            "holders",
            FieldType::Array(Box::new(FieldType::Struct("Holder".into())), 16),
        ));
    let schema = StateSchema::new(schema, "Ledger", 64).unwrap_or_else(|e| panic!("bench schema: {e}"));
    let holders = (0..16u8).map(|i| {
        StructuredState::new()
            .with("owner", [i; 20])
            .with("balance", i as i64 * 100)
    });
    let state = StructuredState::new().with_array("holders", holders);
    let engine = StateDigestEngine::default();

    c.bench_function("state_digest_nested_16_holders", |b| {
        b.iter(|| black_box(engine.digest(&schema, black_box(&state))))
    });
}

criterion_group!(benches, benchmark_digest_by_width, benchmark_nested_digest);
criterion_main!(benches);
