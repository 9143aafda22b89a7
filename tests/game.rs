#![recursion_limit = "256"]
use std::{collections::BTreeMap, time::Duration};

use futures::future::try_join_all;
use polyshare::{
    Error,
    agent::TcpAgentFactory,
    config::{MpcConfig, OtConfig, OtProtocol, SchedulerKind, TupleGeneratorKind},
    frontend::UnsignedInt,
    game::{Game, run_game, simulate_game},
    scheduler::Scheduler,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Every party bids, everybody learns the highest bid and who made it. Ties
/// go to the lower party id.
struct Auction;

async fn reveal_to_all<S: Scheduler, const W: usize>(
    s: &mut S,
    value: &UnsignedInt<W>,
) -> Result<u64, Error> {
    let mut mine = 0;
    for party in 0..s.num_parties() {
        let opened = value.open_to_party(s, party).await?;
        mine |= opened.value(s).await?[0];
        opened.release(s)?;
    }
    Ok(mine)
}

impl Game for Auction {
    type Input = u64;
    type Output = (u64, u64);

    async fn play<S: Scheduler>(&self, s: &mut S, bid: u64) -> Result<(u64, u64), Error> {
        let mut best = UnsignedInt::<16>::private_input(s, 0, &[bid]).await?;
        let mut winner = UnsignedInt::<4>::constant(s, 0, 1);
        for party in 1..s.num_parties() {
            let other = UnsignedInt::<16>::private_input(s, party, &[bid]).await?;
            let id = UnsignedInt::<4>::constant(s, party as u64, 1);
            let higher = other.gt(s, &best).await?;
            let next_best = best.mux(s, &higher, &other).await?;
            let next_winner = winner.mux(s, &higher, &id).await?;
            best.release(s)?;
            winner.release(s)?;
            other.release(s)?;
            id.release(s)?;
            higher.release(s)?;
            best = next_best;
            winner = next_winner;
        }
        Ok((reveal_to_all(s, &best).await?, reveal_to_all(s, &winner).await?))
    }
}

async fn play_over_tcp(config: &MpcConfig, bids: &[u64]) -> Result<Vec<(u64, u64)>, Error> {
    let mut listeners = Vec::new();
    for _ in 0..config.num_parties {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.unwrap());
    }
    let addrs: Vec<_> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();
    let reports = try_join_all(listeners.into_iter().enumerate().map(|(p, listener)| {
        let peers: BTreeMap<_, _> = addrs
            .iter()
            .enumerate()
            .filter(|(q, _)| *q != p)
            .map(|(q, addr)| (q, *addr))
            .collect();
        let config = config.for_party(p);
        let bid = bids[p];
        async move {
            let mut factory =
                TcpAgentFactory::new(p, listener, peers).with_timeout(Duration::from_secs(60));
            run_game(&config, &mut factory, &Auction, bid).await
        }
    }))
    .await?;
    Ok(reports.into_iter().map(|r| r.output).collect())
}

#[tokio::test]
async fn auction_over_tcp() -> Result<(), Error> {
    init_tracing();
    for scheduler in [SchedulerKind::Lazy, SchedulerKind::NetworkPlaintext] {
        let config = MpcConfig {
            num_parties: 3,
            scheduler,
            ot: OtConfig {
                protocol: OtProtocol::Dummy,
                ..OtConfig::default()
            },
            boolean_buffer_size: 500,
            integer_buffer_size: 10,
            ..Default::default()
        };
        let outputs = play_over_tcp(&config, &[30, 70, 50]).await?;
        assert_eq!(outputs, vec![(70, 1); 3], "{scheduler:?}");
    }
    Ok(())
}

#[tokio::test]
async fn ties_go_to_the_first_bidder() -> Result<(), Error> {
    init_tracing();
    let config = MpcConfig {
        num_parties: 4,
        scheduler: SchedulerKind::Eager,
        tuple_generator: TupleGeneratorKind::Dummy,
        ..Default::default()
    };
    let configs: Vec<_> = (0..4).map(|p| config.for_party(p)).collect();
    let reports = simulate_game(&configs, &Auction, vec![9, 12, 12, 3]).await?;
    for report in &reports {
        assert_eq!(report.output, (12, 1));
        assert_eq!(report.wires.allocated, reports[0].wires.allocated);
    }
    Ok(())
}

#[tokio::test]
async fn invalid_configurations_are_rejected() {
    let config = MpcConfig {
        scheduler: SchedulerKind::Plaintext,
        max_unexecuted_gates: 0,
        ..Default::default()
    };
    let configs = [config.for_party(0), config.for_party(1)];
    let result = simulate_game(&configs, &Auction, vec![1, 2]).await;
    assert!(matches!(result, Err(Error::Construction(_))));
}
