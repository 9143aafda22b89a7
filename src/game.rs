//! Running a computation end to end.
//!
//! A [`Game`] describes what every party computes, given a [`Scheduler`].
//! [`run_game`] builds the scheduler selected by an [`MpcConfig`] and plays
//! the game for one party. [`simulate_game`] runs all parties in one process.
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument};

use crate::{
    Error,
    agent::{AgentFactory, InMemoryAgentFactory, TrafficStats},
    config::{MpcConfig, SchedulerKind},
    scheduler::{
        DefaultEagerScheduler, DefaultLazyScheduler, GateStats, NetworkPlaintextScheduler,
        PlaintextScheduler, Scheduler, WireStats,
    },
};

/// A computation that all parties run with the same code.
///
/// Parties must make the same scheduler calls in the same order, so the
/// control flow may only depend on public values.
#[allow(async_fn_in_trait)]
pub trait Game {
    /// The input of one party.
    type Input;
    /// The output of one party.
    type Output;

    /// Plays the game for the party of `scheduler`.
    async fn play<S: Scheduler>(
        &self,
        scheduler: &mut S,
        input: Self::Input,
    ) -> Result<Self::Output, Error>;
}

/// The output of a game together with the cost of computing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameReport<T> {
    /// What [`Game::play`] returned.
    pub output: T,
    /// Bytes sent and received, including tuple generation.
    pub traffic: TrafficStats,
    /// Gates evaluated by the scheduler.
    pub gates: GateStats,
    /// Wires allocated and released by the scheduler.
    pub wires: WireStats,
}

async fn play<S: Scheduler, G: Game>(
    scheduler: &mut S,
    game: &G,
    input: G::Input,
) -> Result<GameReport<G::Output>, Error> {
    let output = game.play(scheduler, input).await?;
    scheduler.flush().await?;
    let report = GameReport {
        output,
        traffic: scheduler.traffic_statistics(),
        gates: scheduler.gate_statistics(),
        wires: scheduler.wire_statistics(),
    };
    debug!(
        sent = report.traffic.sent,
        received = report.traffic.received,
        non_free = report.gates.non_free,
        free = report.gates.free,
        "game finished"
    );
    Ok(report)
}

/// Plays `game` as the party described by `config`.
///
/// The scheduler, the tuple generators and the OT protocol are chosen by
/// `config`. All parties must use the same configuration apart from
/// `party_id`.
#[instrument(level = Level::DEBUG, skip_all, fields(party = config.party_id, scheduler = ?config.scheduler), err)]
pub async fn run_game<F, G>(
    config: &MpcConfig,
    factory: &mut F,
    game: &G,
    input: G::Input,
) -> Result<GameReport<G::Output>, Error>
where
    F: AgentFactory,
    G: Game,
{
    config.validate()?;
    match config.scheduler {
        SchedulerKind::Eager => {
            let mut scheduler = DefaultEagerScheduler::create(config, factory).await?;
            play(&mut scheduler, game, input).await
        }
        SchedulerKind::Lazy => {
            let mut scheduler = DefaultLazyScheduler::create(config, factory).await?;
            play(&mut scheduler, game, input).await
        }
        SchedulerKind::Plaintext => {
            let mut scheduler = PlaintextScheduler::new(config.party_id, config.num_parties)?;
            play(&mut scheduler, game, input).await
        }
        SchedulerKind::NetworkPlaintext => {
            let mut scheduler = NetworkPlaintextScheduler::create(config, factory).await?;
            play(&mut scheduler, game, input).await
        }
    }
}

/// Plays `game` for all parties at once over in-memory channels.
///
/// `configs[i]` and `inputs[i]` belong to party `i`.
pub async fn simulate_game<G: Game>(
    configs: &[MpcConfig],
    game: &G,
    inputs: Vec<G::Input>,
) -> Result<Vec<GameReport<G::Output>>, Error> {
    if configs.len() != inputs.len() {
        return Err(Error::Construction(format!(
            "{} configurations for {} inputs",
            configs.len(),
            inputs.len()
        )));
    }
    if let Some((i, config)) = configs
        .iter()
        .enumerate()
        .find(|(i, c)| c.party_id != *i || c.num_parties != configs.len())
    {
        return Err(Error::Construction(format!(
            "configuration {i} is for party {} of {}",
            config.party_id, config.num_parties
        )));
    }
    let factories = InMemoryAgentFactory::network(configs.len());
    try_join_all(
        configs
            .iter()
            .zip(factories)
            .zip(inputs)
            .map(|((config, mut factory), input)| async move {
                run_game(config, &mut factory, game, input).await
            }),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TupleGeneratorKind, frontend::UnsignedInt};

    struct Sum;

    impl Game for Sum {
        type Input = u64;
        type Output = u64;

        async fn play<S: Scheduler>(&self, s: &mut S, input: u64) -> Result<u64, Error> {
            let mut total = UnsignedInt::<16>::private_input(s, 0, &[input]).await?;
            for owner in 1..s.num_parties() {
                let summand = UnsignedInt::<16>::private_input(s, owner, &[input]).await?;
                total = total.add(s, &summand).await?;
            }
            let opened = total.open_to_party(s, 0).await?;
            Ok(opened.value(s).await?[0])
        }
    }

    #[tokio::test]
    async fn all_schedulers_play() {
        for scheduler in [
            SchedulerKind::Eager,
            SchedulerKind::Lazy,
            SchedulerKind::NetworkPlaintext,
        ] {
            let config = MpcConfig {
                num_parties: 3,
                scheduler,
                tuple_generator: TupleGeneratorKind::Dummy,
                ..Default::default()
            };
            let configs: Vec<_> = (0..3).map(|p| config.for_party(p)).collect();
            let reports = simulate_game(&configs, &Sum, vec![1, 20, 300]).await.unwrap();
            assert_eq!(reports[0].output, 321, "{scheduler:?}");
            assert_eq!(reports[1].output, 0);
            assert_eq!(reports[0].gates, reports[2].gates);
        }
    }

    #[tokio::test]
    async fn rejects_mismatched_configurations() {
        let config = MpcConfig::default();
        let result = simulate_game(&[config.clone(), config], &Sum, vec![1, 2]).await;
        assert!(matches!(result, Err(Error::Construction(_))));
    }
}
