use std::time::Instant;

use criterion::{BenchmarkGroup, BenchmarkId, Criterion, Throughput, measurement::WallTime};
use polyshare::{
    bench_reexports::{RcotPair, transpose_bitmatrix},
    config::{OtConfig, OtProtocol},
};
use rand::{Rng, rng};
use tokio::runtime::Runtime;

pub fn primitives_benchmark(c: &mut Criterion) {
    // Default runtime for "full" feature is multi-threaded
    let rt = Runtime::new().unwrap();

    let mut g = c.benchmark_group("primitives");
    for exp in [13, 16] {
        let count = 2_usize.pow(exp);
        g.throughput(Throughput::Elements(count as u64));
        for protocol in [OtProtocol::Classic, OtProtocol::Ferret] {
            let config = OtConfig {
                protocol,
                ..OtConfig::for_tests()
            };
            let bench_id = BenchmarkId::new(format!("{protocol:?} RCOTs"), count);
            bench_rcots(&mut g, &rt, bench_id, config, count);
        }
    }

    for rows in [128, 1024] {
        let cols = 1 << 14;
        let bench_id = BenchmarkId::new("transpose", format!("{rows}x{cols}"));
        g.throughput(Throughput::Bytes((rows * cols / 8) as u64));
        g.bench_function(bench_id, |b| {
            let mut input = vec![0_u8; rows * cols / 8];
            rng().fill(&mut input[..]);
            let mut output = vec![0_u8; input.len()];
            b.iter(|| transpose_bitmatrix(&input, &mut output, rows));
        });
    }
}

fn bench_rcots(
    g: &mut BenchmarkGroup<'_, WallTime>,
    rt: &Runtime,
    bench_id: BenchmarkId,
    config: OtConfig,
    count: usize,
) {
    g.bench_function(bench_id, |b| {
        b.to_async(rt).iter_custom(|iters| async move {
            // base OTs are part of the setup, not of the measured extension
            let mut pair = RcotPair::setup(&config).await.expect("RCOT setup failed");
            let now = Instant::now();
            for _ in 0..iters {
                pair.rcot(count).await.expect("RCOTs failed");
            }
            now.elapsed()
        })
    });
}
