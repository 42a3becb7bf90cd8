//! Benchmarks for the digest and the two kernel variants

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nip13_core::{KernelParams, KernelVariant, PreparedKernel, digest, run_batch};

fn event_message(content_len: usize) -> (Vec<u8>, usize) {
    let mut message = br#"[0,"79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",1700000000,1,[["p","3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d"],["nonce","0000000000","20"]],""#.to_vec();
    message.extend(std::iter::repeat_n(b'a', content_len));
    message.extend_from_slice(b"\"]");
    let offset = message
        .windows(10)
        .position(|w| w == b"0000000000")
        .unwrap_or_default();
    (message, offset)
}

fn bench_digest(c: &mut Criterion) {
    let input = b"benchmark input data for testing SHA-256 digest performance";

    c.bench_function("digest_single_block", |b| b.iter(|| digest(black_box(input))));
}

fn bench_lane(c: &mut Criterion) {
    let mut group = c.benchmark_group("lane");

    for content_len in [50, 500, 1000] {
        let (message, nonce_offset) = event_message(content_len);
        let params = KernelParams {
            message: &message,
            nonce_offset,
            digit_width: 10,
            difficulty: 40,
        };

        for variant in KernelVariant::ALL {
            let kernel = PreparedKernel::new(variant, params);
            group.bench_with_input(
                BenchmarkId::new(variant.name(), content_len),
                &kernel,
                |b, kernel| {
                    let mut lane = 0u64;
                    b.iter(|| {
                        lane = lane.wrapping_add(1) % 1_000_000;
                        kernel.evaluate(black_box(1_000_000_000), lane)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let (message, nonce_offset) = event_message(200);
    let params = KernelParams {
        message: &message,
        nonce_offset,
        digit_width: 10,
        difficulty: 40,
    };
    let lanes = 10_000;

    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(lanes as u64));
    for variant in KernelVariant::ALL {
        let kernel = PreparedKernel::new(variant, params);
        group.bench_function(variant.name(), |b| {
            b.iter(|| run_batch(&kernel, black_box(1_000_000_000), lanes))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_digest, bench_lane, bench_batch);
criterion_main!(benches);
