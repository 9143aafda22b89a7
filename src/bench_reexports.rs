//! Internals made public for the criterion benches under `benches/`, which
//! build as separate crates. Only compiled with the `__bench` feature and not
//! part of the supported API.
use crate::{
    Error,
    agent::{AgentFactory, CommunicationAgent, InMemoryAgentFactory},
    channel::MemoryChannel,
    config::OtConfig,
    ot::{RandomCorrelatedOt, RcotReceiver, RcotSender},
};

pub fn transpose_bitmatrix(input: &[u8], output: &mut [u8], rows: usize) {
    crate::transpose::transpose_bitmatrix(input, output, rows)
}

/// An RCOT sender and receiver connected in memory, set up and ready to extend.
pub struct RcotPair {
    sender: RcotSender,
    receiver: RcotReceiver,
    sender_agent: CommunicationAgent<MemoryChannel>,
    receiver_agent: CommunicationAgent<MemoryChannel>,
}

impl RcotPair {
    pub async fn setup(config: &OtConfig) -> Result<Self, Error> {
        let mut factories = InMemoryAgentFactory::network(2).into_iter();
        let (Some(mut f0), Some(mut f1)) = (factories.next(), factories.next()) else {
            return Err(Error::Construction("in-memory network without 2 parties".into()));
        };
        let (mut sender_agent, mut receiver_agent) =
            tokio::try_join!(f0.create(1, "bench_rcot"), f1.create(0, "bench_rcot"))?;
        let (sender, receiver) = tokio::try_join!(
            RcotSender::setup(config, &mut sender_agent),
            RcotReceiver::setup(config, &mut receiver_agent)
        )?;
        Ok(Self {
            sender,
            receiver,
            sender_agent,
            receiver_agent,
        })
    }

    pub async fn rcot(&mut self, count: usize) -> Result<(), Error> {
        tokio::try_join!(
            self.sender.rcot(&mut self.sender_agent, count),
            self.receiver.rcot(&mut self.receiver_agent, count)
        )?;
        Ok(())
    }
}
