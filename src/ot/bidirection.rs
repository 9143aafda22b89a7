//! Chosen-message OT in both directions at once.
//!
//! Each party acts as sender with its own message pairs and as receiver with
//! its own choice bits. The RCOT based variant derandomizes one RCOT per
//! transfer in each direction with a single round of masked choices and a
//! single round of masked messages.
use std::ops::BitXor;

use tracing::{Level, debug, instrument};

use crate::{
    agent::CommunicationAgent,
    block::Block,
    channel::{self, Channel},
    config::{OtConfig, OtProtocol},
    crypto::FIXED_KEY_HASH,
    ot::{Error, RcotReceiver, RcotSender, choice_bits, rcot_both_ways, setup_both_ways},
};

/// A message type that can be obliviously transferred.
pub(crate) trait OtMessage: Copy + BitXor<Output = Self> {
    /// Derives a one-time pad for this type from a hashed RCOT key.
    fn mask(hash: Block) -> Self;

    /// Sends `values` to the peer and receives as many values back.
    async fn exchange<C: Channel>(
        agent: &mut CommunicationAgent<C>,
        phase: &str,
        values: &[Self],
    ) -> Result<Vec<Self>, channel::Error>;
}

impl OtMessage for bool {
    fn mask(hash: Block) -> Self {
        hash.lsb()
    }

    async fn exchange<C: Channel>(
        agent: &mut CommunicationAgent<C>,
        phase: &str,
        values: &[Self],
    ) -> Result<Vec<Self>, channel::Error> {
        agent.exchange_bools(phase, values).await
    }
}

impl OtMessage for u64 {
    fn mask(hash: Block) -> Self {
        hash.low()
    }

    async fn exchange<C: Channel>(
        agent: &mut CommunicationAgent<C>,
        phase: &str,
        values: &[Self],
    ) -> Result<Vec<Self>, channel::Error> {
        agent.exchange_u64s(phase, values).await
    }
}

fn hashed(blocks: &[Block]) -> Vec<Block> {
    let mut hashes = blocks.to_vec();
    FIXED_KEY_HASH.tccr_hash_slice_mut(&mut hashes, Block::from);
    hashes
}

/// A bidirectional OT with one peer.
pub(crate) enum BidirectionOt {
    /// Derandomized RCOTs in both directions.
    Rcot {
        sender: RcotSender,
        receiver: RcotReceiver,
    },
    /// Insecure: both parties send both of their messages in the clear.
    Dummy,
}

impl BidirectionOt {
    /// Runs the one-time setup of the configured OT protocol with `agent`'s peer.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(crate) async fn setup<C: Channel>(
        config: &OtConfig,
        agent: &mut CommunicationAgent<C>,
    ) -> Result<Self, Error> {
        if config.protocol == OtProtocol::Dummy {
            return Ok(Self::Dummy);
        }
        let (sender, receiver) = setup_both_ways(config, agent).await?;
        Ok(Self::Rcot { sender, receiver })
    }

    /// Sends the pairs `(input0[i], input1[i])` and receives the peer's message
    /// selected by `choices[i]`.
    #[instrument(level = Level::DEBUG, skip_all, fields(size = choices.len()), err)]
    pub(crate) async fn transfer<C: Channel, T: OtMessage>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        input0: &[T],
        input1: &[T],
        choices: &[bool],
    ) -> Result<Vec<T>, Error> {
        let n = choices.len();
        if input0.len() != n || input1.len() != n {
            return Err(Error::InconsistentLength(format!(
                "{} and {} messages for {n} choices",
                input0.len(),
                input1.len()
            )));
        }
        let received = match self {
            Self::Dummy => {
                let mut msg = input0.to_vec();
                msg.extend_from_slice(input1);
                let peer = T::exchange(agent, "dummy OT messages", &msg).await?;
                let (peer0, peer1) = peer.split_at(n);
                choices
                    .iter()
                    .enumerate()
                    .map(|(i, c)| if *c { peer1[i] } else { peer0[i] })
                    .collect()
            }
            Self::Rcot { sender, receiver } => {
                let delta = sender.delta();
                let (keys, chosen) = rcot_both_ways(sender, receiver, agent, n).await?;
                let masked_choices: Vec<bool> = choice_bits(&chosen)
                    .into_iter()
                    .zip(choices)
                    .map(|(c, choice)| c ^ *choice)
                    .collect();
                let flips = agent
                    .exchange_bools("OT masked choices", &masked_choices)
                    .await?;

                let h0 = hashed(&keys);
                let h1 = hashed(&keys.iter().map(|k| *k ^ delta).collect::<Vec<_>>());
                let hm = hashed(&chosen);
                let mut msg = Vec::with_capacity(2 * n);
                for i in 0..n {
                    let pad = if flips[i] { h1[i] } else { h0[i] };
                    msg.push(input0[i] ^ T::mask(pad));
                }
                for i in 0..n {
                    let pad = if flips[i] { h0[i] } else { h1[i] };
                    msg.push(input1[i] ^ T::mask(pad));
                }
                let peer = T::exchange(agent, "OT masked messages", &msg).await?;
                let (peer0, peer1) = peer.split_at(n);
                (0..n)
                    .map(|i| {
                        let masked = if choices[i] { peer1[i] } else { peer0[i] };
                        masked ^ T::mask(hm[i])
                    })
                    .collect()
            }
        };
        debug!(size = n, "bidirectional OT done");
        Ok(received)
    }
}
