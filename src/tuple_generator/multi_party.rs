use std::collections::BTreeMap;

use futures::future::try_join_all;
use tracing::{Level, debug, instrument};

use crate::{
    Error,
    agent::{AgentFactory, TrafficStats},
    channel::Channel,
    config::MpcConfig,
    crypto::Prg,
    tuple_generator::{
        ArithmeticTupleGenerator, BooleanTuple, BooleanTupleGenerator, CompositeBooleanTuple,
        IntegerTuple, ProductShareGenerator,
    },
};

/// One product share generator per peer, in ascending peer order.
async fn connect_peers<F: AgentFactory>(
    config: &MpcConfig,
    factory: &mut F,
    name: &str,
) -> Result<Vec<ProductShareGenerator<F::Channel>>, Error> {
    let mut peers = Vec::with_capacity(config.num_parties - 1);
    for peer in (0..config.num_parties).filter(|p| *p != config.party_id) {
        peers.push(ProductShareGenerator::create(&config.ot, factory, peer, name).await?);
    }
    Ok(peers)
}

/// Boolean tuples for any number of parties.
///
/// Every party samples its shares of `a` and `b` locally. The cross terms
/// `a_i & b_j` of `(XOR a_i) & (XOR b_j)` are shared pairwise with product
/// share generators.
pub struct MultiPartyTupleGenerator<C: Channel> {
    peers: Vec<ProductShareGenerator<C>>,
    prg: Prg,
}

impl<C: Channel> MultiPartyTupleGenerator<C> {
    /// Connects to all other parties and sets up the OTs.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
    ) -> Result<Self, Error> {
        Ok(Self {
            peers: connect_peers(config, factory, "tuple_generator").await?,
            prg: Prg::from_entropy(),
        })
    }

    /// Shares of `left & right` from local shares of both. All peers are
    /// served concurrently.
    async fn and_shares(&mut self, left: &[bool], right: &[bool]) -> Result<Vec<bool>, Error> {
        let mut product: Vec<bool> = left.iter().zip(right).map(|(l, r)| l & r).collect();
        let crosses = try_join_all(
            self.peers
                .iter_mut()
                .map(|peer| peer.boolean_product_shares(left, right)),
        )
        .await?;
        for cross in crosses {
            product.iter_mut().zip(cross).for_each(|(p, c)| *p ^= c);
        }
        Ok(product)
    }
}

impl<C: Channel> BooleanTupleGenerator for MultiPartyTupleGenerator<C> {
    #[instrument(level = Level::DEBUG, skip_all, fields(n = n), err)]
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        let a = self.prg.random_bits(n);
        let b = self.prg.random_bits(n);
        let c = self.and_shares(&a, &b).await?;
        debug!(n, peers = self.peers.len(), "generated boolean tuples");
        Ok((0..n)
            .map(|i| BooleanTuple {
                a: a[i],
                b: b[i],
                c: c[i],
            })
            .collect())
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error> {
        let mut tuples = BTreeMap::new();
        for (&width, &count) in widths {
            let a = self.prg.random_bits(count);
            let b = self.prg.random_bits(count * width);
            let left: Vec<bool> = a
                .iter()
                .flat_map(|a| std::iter::repeat_n(*a, width))
                .collect();
            let c = self.and_shares(&left, &b).await?;
            let batch = (0..count)
                .map(|t| CompositeBooleanTuple {
                    a: a[t],
                    b: b[t * width..(t + 1) * width].to_vec(),
                    c: c[t * width..(t + 1) * width].to_vec(),
                })
                .collect();
            tuples.insert(width, batch);
        }
        Ok(tuples)
    }

    fn supports_composite(&self) -> bool {
        true
    }

    fn traffic_statistics(&self) -> TrafficStats {
        self.peers
            .iter()
            .fold(TrafficStats::default(), |acc, p| acc + p.traffic_statistics())
    }
}

/// Integer tuples modulo `2^64` for any number of parties, the arithmetic
/// counterpart of [`MultiPartyTupleGenerator`].
pub struct MultiPartyArithmeticTupleGenerator<C: Channel> {
    peers: Vec<ProductShareGenerator<C>>,
    prg: Prg,
}

impl<C: Channel> MultiPartyArithmeticTupleGenerator<C> {
    /// Connects to all other parties and sets up the OTs.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
    ) -> Result<Self, Error> {
        Ok(Self {
            peers: connect_peers(config, factory, "arithmetic_tuple_generator").await?,
            prg: Prg::from_entropy(),
        })
    }
}

impl<C: Channel> ArithmeticTupleGenerator for MultiPartyArithmeticTupleGenerator<C> {
    #[instrument(level = Level::DEBUG, skip_all, fields(n = n), err)]
    async fn get_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error> {
        let a = self.prg.random_u64s(n);
        let b = self.prg.random_u64s(n);
        let mut c: Vec<u64> = a.iter().zip(&b).map(|(a, b)| a.wrapping_mul(*b)).collect();
        let crosses = try_join_all(
            self.peers
                .iter_mut()
                .map(|peer| peer.integer_product_shares(&a, &b)),
        )
        .await?;
        for cross in crosses {
            c.iter_mut()
                .zip(cross)
                .for_each(|(c, x)| *c = c.wrapping_add(x));
        }
        debug!(n, peers = self.peers.len(), "generated integer tuples");
        Ok((0..n)
            .map(|i| IntegerTuple {
                a: a[i],
                b: b[i],
                c: c[i],
            })
            .collect())
    }

    fn traffic_statistics(&self) -> TrafficStats {
        self.peers
            .iter()
            .fold(TrafficStats::default(), |acc, p| acc + p.traffic_statistics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::InMemoryAgentFactory,
        config::{OtConfig, OtProtocol},
        tuple_generator::test_utils::*,
    };

    fn configs(n: usize) -> Vec<MpcConfig> {
        let config = MpcConfig {
            num_parties: n,
            ot: OtConfig {
                protocol: OtProtocol::Classic,
                ..OtConfig::for_tests()
            },
            ..Default::default()
        };
        (0..n).map(|p| config.for_party(p)).collect()
    }

    #[tokio::test]
    async fn three_party_boolean_tuples() {
        let configs = configs(3);
        let factories = InMemoryAgentFactory::network(3);
        let shares = try_join_all(configs.iter().zip(factories).map(|(config, mut f)| async move {
            let mut g = MultiPartyTupleGenerator::create(config, &mut f).await?;
            let tuples = g.get_boolean_tuples(300).await?;
            let widths = BTreeMap::from([(4, 7)]);
            let composite = g.get_composite_tuples(&widths).await?;
            Ok::<_, Error>((tuples, composite))
        }))
        .await
        .unwrap();
        let (tuples, composite): (Vec<_>, Vec<_>) = shares.into_iter().unzip();
        check_boolean_tuples(&tuples);
        check_composite_tuples(&composite, &BTreeMap::from([(4, 7)]));
    }

    #[tokio::test]
    async fn two_and_three_party_integer_tuples() {
        for n in [2, 3] {
            let configs = configs(n);
            let factories = InMemoryAgentFactory::network(n);
            let shares =
                try_join_all(configs.iter().zip(factories).map(|(config, mut f)| async move {
                    let mut g = MultiPartyArithmeticTupleGenerator::create(config, &mut f).await?;
                    g.get_integer_tuples(40).await
                }))
                .await
                .unwrap();
            check_integer_tuples(&shares);
        }
    }

    #[tokio::test]
    async fn four_parties_generate_with_all_peers_at_once() {
        let configs = configs(4);
        let factories = InMemoryAgentFactory::network(4);
        let shares = try_join_all(configs.iter().zip(factories).map(|(config, mut f)| async move {
            let mut booleans = MultiPartyTupleGenerator::create(config, &mut f).await?;
            let mut integers = MultiPartyArithmeticTupleGenerator::create(config, &mut f).await?;
            let tuples = booleans.get_boolean_tuples(129).await?;
            let products = integers.get_integer_tuples(17).await?;
            let traffic = booleans.traffic_statistics() + integers.traffic_statistics();
            Ok::<_, Error>((tuples, products, traffic))
        }))
        .await
        .unwrap();
        let booleans: Vec<_> = shares.iter().map(|(t, _, _)| t.clone()).collect();
        let integers: Vec<_> = shares.iter().map(|(_, t, _)| t.clone()).collect();
        check_boolean_tuples(&booleans);
        check_integer_tuples(&integers);
        let sent: u64 = shares.iter().map(|(_, _, t)| t.sent).sum();
        let received: u64 = shares.iter().map(|(_, _, t)| t.received).sum();
        assert_eq!(sent, received);
    }
}
