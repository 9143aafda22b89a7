//! Random correlated oblivious transfer (RCOT) and bidirectional OT.
//!
//! An RCOT of size `n` between a sender with global correlation `delta` and a
//! receiver gives the sender `n` random blocks `k0[i]` (with LSB 0) and the
//! receiver `k0[i] ^ c_i * delta`, where the choice bit `c_i` is uniformly
//! random and equal to the LSB of the receiver's block. Since `delta` has its
//! LSB set, the receiver can always read its choice bits from its output.
//!
//! Three RCOT protocols are available:
//! - IKNP ("classic"), using 128 Chou-Orlandi base OTs,
//! - FERRET, an LPN based extension bootstrapped with IKNP,
//! - an insecure dummy protocol for tests.
//!
//! All calls take the [`CommunicationAgent`] of the peer explicitly. Both
//! parties must make matching calls in matching order: when two parties run
//! an RCOT sender and an RCOT receiver toward each other over the same agent,
//! the party with the lower id runs its sender first.
use thiserror::Error;

use crate::{
    agent::CommunicationAgent,
    block::Block,
    channel::{self, Channel},
    config::{OtConfig, OtProtocol},
};

mod base;
mod bidirection;
mod dummy;
mod ferret;
mod iknp;

pub(crate) use bidirection::{BidirectionOt, OtMessage};
pub(crate) use dummy::{DummyRcotReceiver, DummyRcotSender};
pub(crate) use ferret::{FerretParams, FerretReceiver, FerretSender};
pub(crate) use iknp::{IknpReceiver, IknpSender};

/// Errors occurring during oblivious transfers.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying channel failed.
    #[error(transparent)]
    Channel(#[from] channel::Error),
    /// A message of the peer could not be interpreted, e.g. an invalid curve point.
    #[error("invalid OT data received during {0}")]
    InvalidOtData(String),
    /// The OT parameters do not describe a valid protocol instance.
    #[error("invalid OT parameters: {0}")]
    InvalidParameters(String),
    /// Inputs of an OT do not have matching lengths.
    #[error("inconsistent OT input length: {0}")]
    InconsistentLength(String),
}

/// One side of a random correlated OT.
pub(crate) trait RandomCorrelatedOt {
    /// Runs `size` RCOTs with the peer of `agent`.
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error>;
}

/// The sending side of an RCOT protocol selected by [`OtProtocol`].
pub(crate) enum RcotSender {
    Iknp(IknpSender),
    Ferret(Box<FerretSender>),
    Dummy(DummyRcotSender),
}

impl RcotSender {
    /// Runs the one-time setup with the peer of `agent`.
    pub(crate) async fn setup<C: Channel>(
        config: &OtConfig,
        agent: &mut CommunicationAgent<C>,
    ) -> Result<Self, Error> {
        Ok(match config.protocol {
            OtProtocol::Classic => Self::Iknp(IknpSender::setup(agent).await?),
            OtProtocol::Ferret => Self::Ferret(Box::new(FerretSender::setup(config, agent).await?)),
            OtProtocol::Dummy => Self::Dummy(DummyRcotSender::new()),
        })
    }

    /// The global correlation of all RCOTs of this sender.
    pub(crate) fn delta(&self) -> Block {
        match self {
            Self::Iknp(s) => s.delta(),
            Self::Ferret(s) => s.delta(),
            Self::Dummy(s) => s.delta(),
        }
    }
}

impl RandomCorrelatedOt for RcotSender {
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        match self {
            Self::Iknp(s) => s.rcot(agent, size).await,
            Self::Ferret(s) => s.rcot(agent, size).await,
            Self::Dummy(s) => s.rcot(agent, size).await,
        }
    }
}

/// The receiving side of an RCOT protocol selected by [`OtProtocol`].
pub(crate) enum RcotReceiver {
    Iknp(IknpReceiver),
    Ferret(Box<FerretReceiver>),
    Dummy(DummyRcotReceiver),
}

impl RcotReceiver {
    /// Runs the one-time setup with the peer of `agent`.
    pub(crate) async fn setup<C: Channel>(
        config: &OtConfig,
        agent: &mut CommunicationAgent<C>,
    ) -> Result<Self, Error> {
        Ok(match config.protocol {
            OtProtocol::Classic => Self::Iknp(IknpReceiver::setup(agent).await?),
            OtProtocol::Ferret => {
                Self::Ferret(Box::new(FerretReceiver::setup(config, agent).await?))
            }
            OtProtocol::Dummy => Self::Dummy(DummyRcotReceiver::new()),
        })
    }
}

impl RandomCorrelatedOt for RcotReceiver {
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        match self {
            Self::Iknp(r) => r.rcot(agent, size).await,
            Self::Ferret(r) => r.rcot(agent, size).await,
            Self::Dummy(r) => r.rcot(agent, size).await,
        }
    }
}

/// Runs an RCOT sender toward `agent`'s peer and an RCOT receiver from it.
///
/// Returns the sender's and the receiver's outputs.
pub(crate) async fn rcot_both_ways<C: Channel>(
    sender: &mut RcotSender,
    receiver: &mut RcotReceiver,
    agent: &mut CommunicationAgent<C>,
    size: usize,
) -> Result<(Vec<Block>, Vec<Block>), Error> {
    if agent.my_id() < agent.peer_id() {
        let sent = sender.rcot(agent, size).await?;
        let received = receiver.rcot(agent, size).await?;
        Ok((sent, received))
    } else {
        let received = receiver.rcot(agent, size).await?;
        let sent = sender.rcot(agent, size).await?;
        Ok((sent, received))
    }
}

/// Sets up an RCOT sender toward `agent`'s peer and an RCOT receiver from it.
pub(crate) async fn setup_both_ways<C: Channel>(
    config: &OtConfig,
    agent: &mut CommunicationAgent<C>,
) -> Result<(RcotSender, RcotReceiver), Error> {
    if agent.my_id() < agent.peer_id() {
        let sender = RcotSender::setup(config, agent).await?;
        let receiver = RcotReceiver::setup(config, agent).await?;
        Ok((sender, receiver))
    } else {
        let receiver = RcotReceiver::setup(config, agent).await?;
        let sender = RcotSender::setup(config, agent).await?;
        Ok((sender, receiver))
    }
}

/// The choice bits of RCOT receiver outputs.
pub(crate) fn choice_bits(blocks: &[Block]) -> Vec<bool> {
    blocks.iter().map(Block::lsb).collect()
}
