//! Benchmarks for off-frame telemetry decoding
//!
//! Tests per-block decode cost for:
//! - Unchanged blocks (the steady state: no events)
//! - Blocks whose every field changes
//! - Limited mode without a capability model
//!
//! Platform: Cross-platform (synthetic blocks, CI-safe)

use criterion::{Criterion, criterion_group, criterion_main};
use lumix_remote::test_utils::fixtures;
use lumix_remote::{CapabilityModel, DescriptorNode, TelemetryDecoder};
use std::hint::black_box;

fn load_model() -> CapabilityModel {
    let tree = DescriptorNode::parse_xml(fixtures::ALLMENU_REPLY).expect("Failed to parse menu");
    CapabilityModel::build(&tree, "en").expect("Failed to build model")
}

fn bench_steady_state(c: &mut Criterion) {
    let model = load_model();
    let block = fixtures::metadata_block(2, 100, 1024, 1280);
    let mut decoder = TelemetryDecoder::default();
    decoder.decode(&block, Some(&model));

    c.bench_function("decode_unchanged_block", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&block), Some(&model))))
    });
}

fn bench_alternating(c: &mut Criterion) {
    let model = load_model();
    let blocks =
        [fixtures::metadata_block(2, 100, 1024, 1280), fixtures::metadata_block(3, 400, 2048, 768)];
    let mut decoder = TelemetryDecoder::default();
    let mut index = 0usize;

    c.bench_function("decode_changed_block", |b| {
        b.iter(|| {
            index ^= 1;
            black_box(decoder.decode(black_box(&blocks[index]), Some(&model)))
        })
    });
}

fn bench_limited_mode(c: &mut Criterion) {
    let blocks = [fixtures::metadata_block(1, 0, 0, 0), fixtures::metadata_block(4, 0, 0, 0)];
    let mut decoder = TelemetryDecoder::default();
    let mut index = 0usize;

    c.bench_function("decode_limited_mode", |b| {
        b.iter(|| {
            index ^= 1;
            black_box(decoder.decode(black_box(&blocks[index]), None))
        })
    });
}

fn bench_model_build(c: &mut Criterion) {
    c.bench_function("capability_model_build", |b| {
        b.iter(|| {
            let tree = DescriptorNode::parse_xml(black_box(fixtures::ALLMENU_REPLY))
                .expect("Failed to parse menu");
            black_box(CapabilityModel::build(&tree, "en").expect("Failed to build model"))
        })
    });
}

criterion_group!(benches, bench_steady_state, bench_alternating, bench_limited_mode, bench_model_build);
criterion_main!(benches);
