//! Insecure RCOT where the sender transmits its keys and `delta` in the clear.
//!
//! Only for tests and benchmarks of the layers above OT.
use tracing::{Level, instrument};

use crate::{
    agent::CommunicationAgent,
    block::Block,
    channel::Channel,
    crypto::Prg,
    ot::{Error, RandomCorrelatedOt},
};

pub(crate) struct DummyRcotSender {
    delta: Block,
    prg: Prg,
}

impl DummyRcotSender {
    pub(crate) fn new() -> Self {
        let mut prg = Prg::from_entropy();
        Self {
            delta: prg.random_block().with_lsb(true),
            prg,
        }
    }

    pub(crate) fn delta(&self) -> Block {
        self.delta
    }
}

impl RandomCorrelatedOt for DummyRcotSender {
    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        let keys: Vec<Block> = self
            .prg
            .random_blocks(size)
            .into_iter()
            .map(|k| k.with_lsb(false))
            .collect();
        let mut msg = Vec::with_capacity(size + 1);
        msg.push(self.delta);
        msg.extend_from_slice(&keys);
        agent.send_blocks("dummy RCOT", &msg).await?;
        Ok(keys)
    }
}

pub(crate) struct DummyRcotReceiver {
    prg: Prg,
}

impl DummyRcotReceiver {
    pub(crate) fn new() -> Self {
        Self {
            prg: Prg::from_entropy(),
        }
    }
}

impl RandomCorrelatedOt for DummyRcotReceiver {
    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        let msg = agent.recv_blocks("dummy RCOT", size + 1).await?;
        let delta = msg[0];
        let choices = self.prg.random_bits(size);
        Ok(msg[1..]
            .iter()
            .zip(choices)
            .map(|(k0, c)| *k0 ^ delta.const_mul(c))
            .collect())
    }
}
