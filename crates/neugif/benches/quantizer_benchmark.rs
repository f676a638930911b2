use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use neugif::NeuQuant;
use std::hint::black_box;

fn generate_noise_rgb(pixels: usize) -> Vec<u8> {
    let mut seed = 0x1234_5678u32;
    (0..pixels * 3)
        .map(|_| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 24) as u8
        })
        .collect()
}

fn bench_train_by_quality(c: &mut Criterion) {
    let rgb = generate_noise_rgb(256 * 256);
    let mut group = c.benchmark_group("neuquant_256x256");

    for quality in [1u32, 10, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(quality), &quality, |b, &q| {
            b.iter(|| NeuQuant::new(black_box(&rgb), q).unwrap())
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let rgb = generate_noise_rgb(128 * 128);
    let nq = NeuQuant::new(&rgb, 10).unwrap();

    c.bench_function("neuquant_nearest_128x128", |b| {
        b.iter(|| {
            rgb.chunks_exact(3)
                .map(|px| nq.nearest(px[0], px[1], px[2]) as u32)
                .sum::<u32>()
        })
    });
}

criterion_group!(benches, bench_train_by_quality, bench_nearest);
criterion_main!(benches);
