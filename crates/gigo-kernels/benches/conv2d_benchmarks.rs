//! Criterion benchmarks for the grouped convolution engine.
//!
//! Tracks the reference loop and the layout transforms around it so a
//! regression in either shows up separately.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use gigo_kernels::cpu::{normalize_weight_layout, pad, to_channel_first};
use gigo_kernels::{Conv2dEngine, Conv2dParams, DataShape, KernelLayout, Padding, WeightShape};

struct BenchmarkData;

impl BenchmarkData {
    fn tensor(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i % 17) as f32 / 17.0 - 0.5).collect()
    }
}

fn bench_conv2d(c: &mut Criterion) {
    let engine = Conv2dEngine::new();
    let mut group = c.benchmark_group("conv2d");

    // (spatial, channels, filters, kernel, groups)
    let cases = [(16, 8, 8, 3, 1), (32, 16, 16, 3, 1), (32, 16, 16, 3, 4), (64, 8, 8, 1, 1)];

    for (size, channels, filters, kernel, groups) in cases {
        let params = Conv2dParams::new(
            KernelLayout::Hwio,
            DataShape::new(1, size, size, channels),
            WeightShape::new(filters, kernel, kernel, channels / groups),
        )
        .with_groups(groups)
        .with_padding(Padding::uniform(kernel / 2));
        let data = BenchmarkData::tensor(params.data.len());
        let weights = BenchmarkData::tensor(params.weight.len());

        let (out_h, out_w) = match params.output_dims() {
            Ok(dims) => dims,
            Err(_) => continue,
        };
        let macs = out_h * out_w * filters * groups * params.weight.filter_len();
        group.throughput(Throughput::Elements(macs as u64));

        group.bench_with_input(
            BenchmarkId::new("reference", format!("{size}x{size}x{channels}_k{kernel}_g{groups}")),
            &params,
            |b, params| {
                b.iter(|| engine.run(black_box(&data), black_box(&weights), black_box(params)))
            },
        );
    }

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");

    for size in [32usize, 64, 128] {
        let channels = 16;
        let data = BenchmarkData::tensor(size * size * channels);
        group.throughput(Throughput::Elements(data.len() as u64));

        group.bench_with_input(BenchmarkId::new("pad", size), &size, |b, &size| {
            b.iter(|| pad(black_box(&data), size, size, channels, &Padding::uniform(1)))
        });

        group.bench_with_input(BenchmarkId::new("to_channel_first", size), &size, |b, &size| {
            b.iter(|| to_channel_first(black_box(data.clone()), size, size, channels))
        });
    }

    let shape = WeightShape::new(64, 3, 3, 64);
    let weights = BenchmarkData::tensor(shape.len());
    for layout in [KernelLayout::Hwio, KernelLayout::Hwoi] {
        group.bench_function(BenchmarkId::new("normalize_weights", layout), |b| {
            b.iter(|| normalize_weight_layout(black_box(&weights), &shape, layout))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_conv2d, bench_layout);
criterion_main!(benches);
