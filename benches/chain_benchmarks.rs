//! Chain Benchmarks
//!
//! Throughput of the effect chain at typical host block sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use adlib_fx::dsp::{EffectChain, FilterStage, ReverbStage, Stage};
use adlib_fx::engine::{generate_test_tone, ChannelLayout};
use adlib_fx::{ParamSnapshot, Processor};

fn benchmark_processor_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("processor_1s_stereo");

    for block_size in [64_usize, 256, 1024] {
        let source = generate_test_tone(440.0, 0.5, 1.0, ChannelLayout::Stereo, 48000);
        let mut processor = Processor::new();
        processor
            .prepare(48000.0, block_size, 2)
            .expect("valid configuration");

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &block_size| {
                b.iter(|| {
                    let mut buffer = source.clone();
                    let frames = buffer.len();
                    let mut offset = 0;
                    while offset < frames {
                        let end = (offset + block_size).min(frames);
                        let mut block: Vec<&mut [f32]> = buffer
                            .samples
                            .iter_mut()
                            .map(|channel| &mut channel[offset..end])
                            .collect();
                        processor.process_block(black_box(&mut block));
                        offset = end;
                    }
                    buffer
                })
            },
        );
    }

    group.finish();
}

fn benchmark_bypassed_chain(c: &mut Criterion) {
    let mut chain = EffectChain::new();
    chain.prepare(48000.0, 512, 2);
    let params = ParamSnapshot::bypassed();
    let mut buffer = vec![vec![0.25_f32; 512]; 2];

    c.bench_function("chain_bypassed_512", |b| {
        b.iter(|| chain.process(black_box(&params), &mut buffer, 0, 512))
    });
}

fn benchmark_single_stages(c: &mut Criterion) {
    let params = ParamSnapshot::default();
    let source = generate_test_tone(220.0, 0.5, 512.0 / 48000.0, ChannelLayout::Stereo, 48000);

    let mut filter = FilterStage::new();
    filter.prepare(48000.0, 512);
    c.bench_function("filter_512", |b| {
        b.iter(|| {
            let mut block = source.samples.clone();
            filter.process(&params.filter, black_box(&mut block), 512);
            block
        })
    });

    let mut reverb = ReverbStage::new();
    reverb.prepare(48000.0, 512);
    c.bench_function("reverb_512", |b| {
        b.iter(|| {
            let mut block = source.samples.clone();
            reverb.process(&params.reverb, black_box(&mut block), 512);
            block
        })
    });
}

criterion_group!(
    benches,
    benchmark_processor_blocks,
    benchmark_bypassed_chain,
    benchmark_single_stages
);
criterion_main!(benches);
