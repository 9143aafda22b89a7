use std::collections::BTreeMap;

use tracing::{Level, debug, instrument};

use crate::{
    Error,
    agent::{AgentFactory, CommunicationAgent, TrafficStats},
    block::Block,
    channel::Channel,
    config::OtConfig,
    crypto::FIXED_KEY_HASH,
    ot::{RcotReceiver, RcotSender, rcot_both_ways, setup_both_ways},
    tuple_generator::{BooleanTuple, BooleanTupleGenerator, CompositeBooleanTuple},
};

fn bit(block: &Block, i: usize) -> bool {
    (block.as_bytes()[i / 8] >> (i % 8)) & 1 == 1
}

/// `width` pseudorandom bits derived from `key`, 128 bits per tweak.
fn expand(key: Block, width: usize) -> Vec<bool> {
    let mut bits = Vec::with_capacity(width);
    for chunk in 0..width.div_ceil(Block::BITS) {
        let hash = FIXED_KEY_HASH.tccr_hash_block(Block::from(chunk), key);
        let len = (width - chunk * Block::BITS).min(Block::BITS);
        bits.extend((0..len).map(|i| bit(&hash, i)));
    }
    bits
}

/// Boolean tuples from random correlated OTs in both directions.
///
/// Hashing the two keys of an RCOT gives two random bits. Their XOR is a
/// random factor known to the RCOT sender and the receiver's choice bit
/// selects which of them the receiver learns, so the pair already is a
/// sharing of the product of the sender's factor and the choice bit. One
/// RCOT per direction and tuple suffices and no further messages are needed.
pub struct TwoPartyTupleGenerator<C: Channel> {
    agent: CommunicationAgent<C>,
    sender: RcotSender,
    receiver: RcotReceiver,
}

impl<C: Channel> TwoPartyTupleGenerator<C> {
    /// Connects to `peer` and sets up the RCOTs of both directions.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &OtConfig,
        factory: &mut F,
        peer: usize,
    ) -> Result<Self, Error> {
        let mut agent = factory.create(peer, "two_party_tuple_generator").await?;
        let (sender, receiver) = setup_both_ways(config, &mut agent).await?;
        Ok(Self {
            agent,
            sender,
            receiver,
        })
    }

    async fn rcots(&mut self, n: usize) -> Result<(Vec<Block>, Vec<Block>), Error> {
        Ok(rcot_both_ways(&mut self.sender, &mut self.receiver, &mut self.agent, n).await?)
    }
}

fn hashed(blocks: impl Iterator<Item = Block>) -> Vec<Block> {
    let mut hashes: Vec<Block> = blocks.collect();
    FIXED_KEY_HASH.tccr_hash_slice_mut(&mut hashes, Block::from);
    hashes
}

impl<C: Channel> BooleanTupleGenerator for TwoPartyTupleGenerator<C> {
    #[instrument(level = Level::DEBUG, skip_all, fields(n = n), err)]
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        let (keys, chosen) = self.rcots(n).await?;
        let delta = self.sender.delta();
        let h0 = hashed(keys.iter().copied());
        let h1 = hashed(keys.iter().map(|k| *k ^ delta));
        let hm = hashed(chosen.iter().copied());
        let tuples = (0..n)
            .map(|i| {
                let a = h0[i].lsb() ^ h1[i].lsb();
                let b = chosen[i].lsb();
                let c = (a & b) ^ h0[i].lsb() ^ hm[i].lsb();
                BooleanTuple { a, b, c }
            })
            .collect();
        debug!(n, "generated boolean tuples");
        Ok(tuples)
    }

    #[instrument(level = Level::DEBUG, skip_all, err)]
    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error> {
        let total: usize = widths.values().sum();
        let (keys, chosen) = self.rcots(total).await?;
        let delta = self.sender.delta();
        let mut offset = 0;
        let mut tuples = BTreeMap::new();
        for (&width, &count) in widths {
            let batch = (offset..offset + count)
                .map(|i| {
                    let h0 = expand(keys[i], width);
                    let h1 = expand(keys[i] ^ delta, width);
                    let hm = expand(chosen[i], width);
                    let a = chosen[i].lsb();
                    let b: Vec<bool> = h0.iter().zip(&h1).map(|(x, y)| x ^ y).collect();
                    let c = (0..width).map(|j| (a & b[j]) ^ h0[j] ^ hm[j]).collect();
                    CompositeBooleanTuple { a, b, c }
                })
                .collect();
            offset += count;
            tuples.insert(width, batch);
        }
        debug!(total, "generated composite tuples");
        Ok(tuples)
    }

    fn supports_composite(&self) -> bool {
        true
    }

    fn traffic_statistics(&self) -> TrafficStats {
        self.agent.traffic_statistics()
    }
}
