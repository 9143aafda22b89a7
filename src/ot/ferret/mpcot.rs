//! Multi point COT with a regular error: one punctured point per bin.
use tracing::{Level, debug, instrument};

use super::spcot::{SinglePointCot, message_len};
use crate::{
    agent::CommunicationAgent, block::Block, channel::Channel, crypto::Prg, ot::Error,
};

pub(super) struct RegularErrorMultiPointCot {
    weight: usize,
    depth: usize,
    spcot: SinglePointCot,
}

impl RegularErrorMultiPointCot {
    pub(super) fn new(weight: usize, depth: usize) -> Self {
        Self {
            weight,
            depth,
            spcot: SinglePointCot::new(),
        }
    }

    /// Number of base RCOTs consumed per call.
    pub(super) fn base_len(&self) -> usize {
        self.weight * self.depth
    }

    /// Number of output blocks per call.
    pub(super) fn output_len(&self) -> usize {
        self.weight << self.depth
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(super) async fn send<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        delta: Block,
        base: &[Block],
    ) -> Result<Vec<Block>, Error> {
        check_base_len(self.base_len(), base.len())?;
        let mut prg = Prg::from_entropy();
        let mut out = vec![Block::ZERO; self.output_len()];
        let mut msg = Vec::with_capacity(self.weight * message_len(self.depth));
        for (bin, base) in out
            .chunks_exact_mut(1 << self.depth)
            .zip(base.chunks_exact(self.depth))
        {
            self.spcot
                .send_tree(delta, base, prg.random_block(), bin, &mut msg);
        }
        agent.send_blocks("MPCOT layer sums", &msg).await?;
        debug!(trees = self.weight, depth = self.depth, "sent MPCOT");
        Ok(out)
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(super) async fn receive<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        base: &[Block],
    ) -> Result<Vec<Block>, Error> {
        check_base_len(self.base_len(), base.len())?;
        let msg_len = message_len(self.depth);
        let msg = agent
            .recv_blocks("MPCOT layer sums", self.weight * msg_len)
            .await?;
        let mut out = vec![Block::ZERO; self.output_len()];
        for ((bin, base), msg) in out
            .chunks_exact_mut(1 << self.depth)
            .zip(base.chunks_exact(self.depth))
            .zip(msg.chunks_exact(msg_len))
        {
            self.spcot.receive_tree(base, msg, bin);
        }
        debug!(trees = self.weight, depth = self.depth, "received MPCOT");
        Ok(out)
    }
}

fn check_base_len(expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::InconsistentLength(format!(
            "MPCOT needs {expected} base RCOTs, got {actual}"
        )))
    }
}
