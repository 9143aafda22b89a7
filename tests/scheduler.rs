use futures::future::try_join_all;
use polyshare::{
    Error,
    agent::{InMemoryAgentFactory, TrafficStats},
    config::{MpcConfig, OtConfig, OtProtocol, SchedulerKind, TupleGeneratorKind},
    frontend::{Bit, UnsignedInt},
    scheduler::{
        DefaultEagerScheduler, DefaultLazyScheduler, GateStats, NetworkPlaintextScheduler,
        PlaintextScheduler, Scheduler,
    },
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const BITS_0: [bool; 6] = [true, false, true, true, false, true];
const BITS_1: [bool; 6] = [true, true, false, true, false, false];
const MASK: [bool; 6] = [false, false, true, true, true, false];
const INTS_0: [u64; 3] = [7, u64::MAX, 1 << 33];
const INTS_1: [u64; 3] = [6, 3, 1 << 31];

/// What one party sees at the end of [`circuit`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct Outcome {
    bits: Vec<bool>,
    recovered: Vec<bool>,
    ints: Vec<u64>,
    gates: GateStats,
}

/// Touches every gate type. Every party passes the real inputs, so the
/// plaintext scheduler computes the same values as the others.
async fn circuit<S: Scheduler>(s: &mut S) -> Result<Outcome, Error> {
    let last = s.num_parties() - 1;
    let a = s.private_boolean_input(0, &BITS_0).await?;
    let b = s.private_boolean_input(last, &BITS_1).await?;
    let mask = s.public_boolean_input(&MASK);

    let and = s.and(a, b).await?;
    let masked = s.xor(and, mask)?;
    let composite = s.composite_and(a, &[b, mask, masked]).await?;
    let not = s.not(composite[2])?;
    let either = s.xor(composite[0], composite[1])?;
    let batch = s.batching_boolean(&[not, either])?;
    let opened = s.open_boolean_to_party(batch, 0).await?;
    let bits = s.boolean_value(opened).await?;

    let shares = s.extract_boolean_share(masked).await?;
    let recovered = s.recover_boolean_wire(&shares).await?;
    let recovered = s.open_boolean_to_party(recovered, last).await?;
    let recovered = s.boolean_value(recovered).await?;

    let u = s.private_integer_input(0, &INTS_0).await?;
    let v = s.private_integer_input(1, &INTS_1).await?;
    let offset = s.public_integer_input(&[1, 1, 1]);
    let product = s.mult(u, v).await?;
    let shifted = s.plus(product, offset)?;
    let negated = s.neg(shifted)?;
    let scaled = s.mult(negated, offset).await?;
    let parts = s.unbatching_integer(scaled, &[1, 2])?;
    let swapped = s.batching_integer(&[parts[1], parts[0]])?;
    let opened = s.open_integer_to_party(swapped, 1).await?;
    let ints = s.integer_value(opened).await?;

    for wire in [a, b, mask, and, masked, not, either, batch] {
        s.release_boolean(wire)?;
    }
    for wire in [u, v, product, shifted, negated] {
        s.release_integer(wire)?;
    }
    s.flush().await?;
    Ok(Outcome {
        bits,
        recovered,
        ints,
        gates: s.gate_statistics(),
    })
}

async fn run(config: &MpcConfig) -> Result<Vec<Outcome>, Error> {
    let factories = InMemoryAgentFactory::network(config.num_parties);
    try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
        let config = config.for_party(p);
        async move {
            match config.scheduler {
                SchedulerKind::Eager => {
                    circuit(&mut DefaultEagerScheduler::create(&config, &mut f).await?).await
                }
                SchedulerKind::Lazy => {
                    circuit(&mut DefaultLazyScheduler::create(&config, &mut f).await?).await
                }
                SchedulerKind::Plaintext => {
                    circuit(&mut PlaintextScheduler::new(p, config.num_parties)?).await
                }
                SchedulerKind::NetworkPlaintext => {
                    circuit(&mut NetworkPlaintextScheduler::create(&config, &mut f).await?).await
                }
            }
        }
    }))
    .await
}

fn expected(num_parties: usize) -> Vec<Outcome> {
    let and: Vec<bool> = BITS_0.iter().zip(BITS_1).map(|(a, b)| a & b).collect();
    let masked: Vec<bool> = and.iter().zip(MASK).map(|(a, m)| a ^ m).collect();
    let not: Vec<bool> = BITS_0.iter().zip(&masked).map(|(a, m)| !(a & m)).collect();
    let either: Vec<bool> = BITS_0
        .iter()
        .zip(BITS_1)
        .zip(MASK)
        .map(|((a, b), m)| (a & b) ^ (a & m))
        .collect();
    let ints: Vec<u64> = INTS_0
        .iter()
        .zip(INTS_1)
        .map(|(u, v)| u.wrapping_mul(v).wrapping_add(1).wrapping_neg())
        .collect();
    (0..num_parties)
        .map(|p| Outcome {
            bits: if p == 0 {
                [not.clone(), either.clone()].concat()
            } else {
                vec![false; 2 * not.len()]
            },
            recovered: if p == num_parties - 1 {
                masked.clone()
            } else {
                vec![false; masked.len()]
            },
            ints: if p == 1 {
                vec![ints[1], ints[2], ints[0]]
            } else {
                vec![0; 3]
            },
            gates: GateStats::default(),
        })
        .collect()
}

#[tokio::test]
async fn all_schedulers_compute_the_same_values() -> Result<(), Error> {
    init_tracing();
    for num_parties in [2, 3] {
        let mut stats = Vec::new();
        for scheduler in [
            SchedulerKind::Plaintext,
            SchedulerKind::NetworkPlaintext,
            SchedulerKind::Eager,
            SchedulerKind::Lazy,
        ] {
            let config = MpcConfig {
                num_parties,
                scheduler,
                tuple_generator: TupleGeneratorKind::Dummy,
                ..Default::default()
            };
            let mut outcomes = run(&config).await?;
            stats.push(outcomes[0].gates);
            outcomes.iter_mut().for_each(|o| o.gates = GateStats::default());
            assert_eq!(outcomes, expected(num_parties), "{scheduler:?}");
        }
        assert!(stats.windows(2).all(|w| w[0] == w[1]), "{stats:?}");
    }
    Ok(())
}

#[tokio::test]
async fn lazy_scheduler_with_iknp_tuples() -> Result<(), Error> {
    init_tracing();
    let config = MpcConfig {
        num_parties: 3,
        scheduler: SchedulerKind::Lazy,
        tuple_generator: TupleGeneratorKind::Secure,
        ot: OtConfig {
            protocol: OtProtocol::Classic,
            ..OtConfig::for_tests()
        },
        boolean_buffer_size: 64,
        integer_buffer_size: 8,
        max_unexecuted_gates: 4,
        ..Default::default()
    };
    let mut outcomes = run(&config).await?;
    outcomes.iter_mut().for_each(|o| o.gates = GateStats::default());
    assert_eq!(outcomes, expected(3));
    Ok(())
}

#[tokio::test]
async fn released_wires_can_not_be_used() -> Result<(), Error> {
    let mut s = PlaintextScheduler::new(0, 2)?;
    let a = s.public_boolean_input(&[true]);
    let b = s.not(a)?;
    s.release_boolean(a)?;
    assert_eq!(s.boolean_value(b).await?, vec![false]);
    assert!(matches!(s.xor(a, b), Err(Error::InvalidAccess(_))));
    assert!(matches!(s.release_boolean(a), Err(Error::InvalidAccess(_))));
    let stats = s.wire_statistics();
    assert_eq!((stats.allocated, stats.deallocated), (2, 1));
    Ok(())
}

/// Traffic before and after evaluating only gates that need no
/// communication, and the opened results at party 0.
async fn free_gates<S: Scheduler>(
    s: &mut S,
) -> Result<(TrafficStats, TrafficStats, Vec<bool>, Vec<u64>), Error> {
    let a = s.private_boolean_input(0, &BITS_0).await?;
    let b = s.private_boolean_input(1, &BITS_1).await?;
    let mask = s.public_boolean_input(&MASK);
    let u = s.private_integer_input(0, &INTS_0).await?;
    let v = s.private_integer_input(1, &INTS_1).await?;
    let factor = s.public_integer_input(&[1, 2, 3]);
    s.flush().await?;
    let before = s.traffic_statistics();
    let non_free = s.gate_statistics().non_free;

    let xor = s.xor(a, b)?;
    let not = s.not(xor)?;
    let masked = s.and(not, mask).await?;
    let sum = s.plus(u, v)?;
    let negated = s.neg(sum)?;
    let scaled = s.mult(negated, factor).await?;
    s.flush().await?;
    let after = s.traffic_statistics();
    assert_eq!(s.gate_statistics().non_free, non_free);

    let bits = s.open_boolean_to_party(masked, 0).await?;
    let ints = s.open_integer_to_party(scaled, 0).await?;
    Ok((before, after, s.boolean_value(bits).await?, s.integer_value(ints).await?))
}

#[tokio::test]
async fn free_gates_cause_no_traffic() -> Result<(), Error> {
    init_tracing();
    for scheduler in [SchedulerKind::Eager, SchedulerKind::Lazy] {
        let config = MpcConfig {
            num_parties: 3,
            scheduler,
            tuple_generator: TupleGeneratorKind::Dummy,
            ..Default::default()
        };
        let factories = InMemoryAgentFactory::network(3);
        let results = try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                if config.scheduler == SchedulerKind::Eager {
                    free_gates(&mut DefaultEagerScheduler::create(&config, &mut f).await?).await
                } else {
                    free_gates(&mut DefaultLazyScheduler::create(&config, &mut f).await?).await
                }
            }
        }))
        .await?;

        let bits: Vec<bool> = BITS_0
            .iter()
            .zip(BITS_1)
            .zip(MASK)
            .map(|((a, b), m)| !(a ^ b) & m)
            .collect();
        let ints: Vec<u64> = INTS_0
            .iter()
            .zip(INTS_1)
            .zip([1, 2, 3])
            .map(|((u, v), f)| u.wrapping_add(v).wrapping_neg().wrapping_mul(f))
            .collect();
        for (before, after, _, _) in &results {
            assert_eq!(before, after, "{scheduler:?}");
        }
        assert_eq!((&results[0].2, &results[0].3), (&bits, &ints), "{scheduler:?}");
    }
    Ok(())
}

fn live_wires<S: Scheduler>(s: &S) -> u64 {
    let stats = s.wire_statistics();
    stats.allocated - stats.deallocated
}

/// Live wires before and after computing and releasing muxes and an OR.
async fn mux_and_or<S: Scheduler>(s: &mut S) -> Result<(u64, u64), Error> {
    let a = UnsignedInt::<8>::private_input(s, 0, &[1, 2, 3]).await?;
    let b = UnsignedInt::<8>::private_input(s, 1, &[4, 5, 6]).await?;
    let choice = Bit::private_input(s, 1, &[true, false, true]).await?;
    s.flush().await?;
    let before = live_wires(s);

    let fast = a.fast_mux(s, &choice, &b).await?;
    let slow = a.slow_mux(s, &choice, &b).await?;
    let or = choice.or(s, &choice).await?;
    s.flush().await?;
    fast.release(s)?;
    slow.release(s)?;
    or.release(s)?;
    Ok((before, live_wires(s)))
}

#[tokio::test]
async fn frontend_gates_release_their_temporaries() -> Result<(), Error> {
    init_tracing();
    let config = MpcConfig {
        scheduler: SchedulerKind::Lazy,
        tuple_generator: TupleGeneratorKind::Dummy,
        ..Default::default()
    };
    let factories = InMemoryAgentFactory::network(2);
    let results = try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
        let config = config.for_party(p);
        async move { mux_and_or(&mut DefaultLazyScheduler::create(&config, &mut f).await?).await }
    }))
    .await?;
    for (before, after) in results {
        assert_eq!(before, after);
    }
    Ok(())
}
