use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput};
use polyshare::{
    Error,
    config::{MpcConfig, OtConfig, SchedulerKind, TupleGeneratorKind},
    frontend::UnsignedInt,
    game::{Game, simulate_game},
    scheduler::Scheduler,
};
use rand::{Rng, rng};
use tokio::runtime::Runtime;

pub fn mpc_benchmarks(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    bench_comparisons(c, &rt);
}

/// Compares one 32-bit integer of party 0 with one of party 1 per lane.
struct Compare;

impl Game for Compare {
    type Input = Vec<u64>;
    type Output = Vec<bool>;

    async fn play<S: Scheduler>(&self, s: &mut S, input: Vec<u64>) -> Result<Vec<bool>, Error> {
        let a = UnsignedInt::<32>::private_input(s, 0, &input).await?;
        let b = UnsignedInt::<32>::private_input(s, 1, &input).await?;
        let lt = a.lt(s, &b).await?;
        let opened = lt.open_to_party(s, 0).await?;
        opened.value(s).await
    }
}

/// Batched comparisons with every scheduler that runs a real protocol.
fn bench_comparisons(c: &mut Criterion, rt: &Runtime) {
    let lanes = 16_384;
    let mut g = c.benchmark_group("mpc");
    g.throughput(Throughput::Elements(lanes as u64));

    let cases = [
        (SchedulerKind::Lazy, TupleGeneratorKind::Secure),
        (SchedulerKind::Eager, TupleGeneratorKind::Secure),
        (SchedulerKind::Lazy, TupleGeneratorKind::Dummy),
        (SchedulerKind::NetworkPlaintext, TupleGeneratorKind::Null),
    ];
    for (scheduler, tuple_generator) in cases {
        let config = MpcConfig {
            scheduler,
            tuple_generator,
            ot: OtConfig::for_tests(),
            ..Default::default()
        };
        let bench_id = BenchmarkId::new(
            "32-bit comparisons",
            format!("{scheduler:?}/{tuple_generator:?}"),
        );
        g.bench_function(bench_id, |b| {
            b.to_async(rt).iter_custom(|iters| {
                let config = config.clone();
                async move {
                    let configs = [config.for_party(0), config.for_party(1)];
                    let mut elapsed = Duration::default();
                    for _ in 0..iters {
                        let inputs: Vec<Vec<u64>> = (0..2)
                            .map(|_| (0..lanes).map(|_| rng().random::<u32>() as u64).collect())
                            .collect();
                        let now = Instant::now();
                        let reports = simulate_game(&configs, &Compare, inputs)
                            .await
                            .expect("comparison failed");
                        elapsed += now.elapsed();
                        assert_eq!(reports[0].output.len(), lanes);
                    }
                    elapsed
                }
            })
        });
    }
}
