use tracing::{Level, instrument};

use crate::{
    Error,
    agent::{AgentFactory, CommunicationAgent, TrafficStats},
    channel::Channel,
    config::OtConfig,
    crypto::Prg,
    ot::BidirectionOt,
};

/// Computes shares of cross products with one peer.
///
/// With local inputs `left_0, right_0` and the peer's inputs `left_1, right_1`,
/// the outputs of both parties sum (or XOR) to `left_0 * right_1 + left_1 * right_0`.
pub struct ProductShareGenerator<C: Channel> {
    agent: CommunicationAgent<C>,
    ot: BidirectionOt,
    prg: Prg,
}

impl<C: Channel> ProductShareGenerator<C> {
    /// Connects to `peer` on a channel called `name` and sets up the OTs.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &OtConfig,
        factory: &mut F,
        peer: usize,
        name: &str,
    ) -> Result<Self, Error> {
        let mut agent = factory.create(peer, name).await?;
        let ot = BidirectionOt::setup(config, &mut agent).await?;
        Ok(Self {
            agent,
            ot,
            prg: Prg::from_entropy(),
        })
    }

    /// XOR shares of `left_0 & right_1 ^ left_1 & right_0`.
    #[instrument(level = Level::DEBUG, skip_all, fields(n = left.len()), err)]
    pub async fn boolean_product_shares(
        &mut self,
        left: &[bool],
        right: &[bool],
    ) -> Result<Vec<bool>, Error> {
        check_lengths(left.len(), right.len())?;
        let input0 = self.prg.random_bits(left.len());
        let input1: Vec<bool> = input0.iter().zip(left).map(|(r, l)| r ^ l).collect();
        let received = self
            .ot
            .transfer(&mut self.agent, &input0, &input1, right)
            .await?;
        Ok(received.into_iter().zip(input0).map(|(x, r)| x ^ r).collect())
    }

    /// Additive shares of `left_0 * right_1 + left_1 * right_0` modulo `2^64`.
    ///
    /// Uses one OT per bit of `right`.
    #[instrument(level = Level::DEBUG, skip_all, fields(n = left.len()), err)]
    pub async fn integer_product_shares(
        &mut self,
        left: &[u64],
        right: &[u64],
    ) -> Result<Vec<u64>, Error> {
        check_lengths(left.len(), right.len())?;
        let input0 = self.prg.random_u64s(left.len() * 64);
        let mut input1 = Vec::with_capacity(input0.len());
        let mut choices = Vec::with_capacity(input0.len());
        for (e, (l, r)) in left.iter().zip(right).enumerate() {
            for j in 0..64 {
                input1.push(input0[e * 64 + j].wrapping_add(l.wrapping_shl(j as u32)));
                choices.push((r >> j) & 1 == 1);
            }
        }
        let received = self
            .ot
            .transfer(&mut self.agent, &input0, &input1, &choices)
            .await?;
        Ok(received
            .chunks_exact(64)
            .zip(input0.chunks_exact(64))
            .map(|(received, sent)| {
                received
                    .iter()
                    .zip(sent)
                    .fold(0u64, |acc, (x, r)| acc.wrapping_add(x.wrapping_sub(*r)))
            })
            .collect())
    }

    /// Traffic with the peer so far.
    pub fn traffic_statistics(&self) -> TrafficStats {
        self.agent.traffic_statistics()
    }
}

fn check_lengths(left: usize, right: usize) -> Result<(), Error> {
    if left == right {
        Ok(())
    } else {
        Err(Error::Construction(format!(
            "product share inputs of length {left} and {right}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::InMemoryAgentFactory,
        config::{OtConfig, OtProtocol},
    };

    async fn pair(
        protocol: OtProtocol,
    ) -> (
        ProductShareGenerator<crate::channel::MemoryChannel>,
        ProductShareGenerator<crate::channel::MemoryChannel>,
    ) {
        let config = OtConfig {
            protocol,
            ..OtConfig::for_tests()
        };
        let mut factories = InMemoryAgentFactory::network(2);
        let mut f1 = factories.pop().unwrap();
        let mut f0 = factories.pop().unwrap();
        tokio::try_join!(
            ProductShareGenerator::create(&config, &mut f0, 1, "product"),
            ProductShareGenerator::create(&config, &mut f1, 0, "product")
        )
        .unwrap()
    }

    #[tokio::test]
    async fn boolean_cross_products() {
        let (mut g0, mut g1) = pair(OtProtocol::Classic).await;
        let mut prg = Prg::from_entropy();
        let (l0, r0, l1, r1) = (
            prg.random_bits(500),
            prg.random_bits(500),
            prg.random_bits(500),
            prg.random_bits(500),
        );
        let (s0, s1) = tokio::try_join!(
            g0.boolean_product_shares(&l0, &r0),
            g1.boolean_product_shares(&l1, &r1)
        )
        .unwrap();
        for i in 0..500 {
            assert_eq!((l0[i] & r1[i]) ^ (l1[i] & r0[i]), s0[i] ^ s1[i]);
        }
    }

    #[tokio::test]
    async fn integer_cross_products() {
        let (mut g0, mut g1) = pair(OtProtocol::Ferret).await;
        let mut prg = Prg::from_entropy();
        let (l0, r0, l1, r1) = (
            prg.random_u64s(50),
            prg.random_u64s(50),
            prg.random_u64s(50),
            prg.random_u64s(50),
        );
        let (s0, s1) = tokio::try_join!(
            g0.integer_product_shares(&l0, &r0),
            g1.integer_product_shares(&l1, &r1)
        )
        .unwrap();
        for i in 0..50 {
            let expected = l0[i].wrapping_mul(r1[i]).wrapping_add(l1[i].wrapping_mul(r0[i]));
            assert_eq!(expected, s0[i].wrapping_add(s1[i]));
        }
        assert!(g0.traffic_statistics().sent > 0);
    }
}
