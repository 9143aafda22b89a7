//! Single point COT from a GGM tree.
//!
//! The sender expands a random seed into `2^depth` leaves. For every layer of
//! the tree it sends the XOR of all left and of all right children, each masked
//! with the hash of one of the two keys of a base COT. The receiver can unmask
//! exactly the side given by its choice bit, which lets it rebuild every node
//! except those on one path. The leaf at the end of that path is the punctured
//! point, where the receiver's output differs from the sender's by `delta`.
use crate::{
    block::Block,
    crypto::{AesHash, Expander},
};

/// Number of blocks the sender transmits per tree.
pub(super) fn message_len(depth: usize) -> usize {
    2 * depth + 1
}

/// Builds GGM trees. Sender and receiver must build the same number of trees
/// so that the tree indices of both sides match.
pub(super) struct SinglePointCot {
    index: u64,
}

struct TreeKeys {
    expander: Expander,
    layer_hash: AesHash,
}

impl SinglePointCot {
    pub(super) fn new() -> Self {
        Self { index: 0 }
    }

    fn next_keys(&mut self) -> TreeKeys {
        let keys = TreeKeys {
            expander: Expander::new(self.index),
            layer_hash: AesHash::with_block_key(Block::pack(0, self.index)),
        };
        self.index += 1;
        keys
    }

    /// Expands `seed` into the leaves in `out` and appends the message for
    /// the receiver to `msg`.
    ///
    /// `base` holds one RCOT sender block per layer.
    pub(super) fn send_tree(
        &mut self,
        delta: Block,
        base: &[Block],
        seed: Block,
        out: &mut [Block],
        msg: &mut Vec<Block>,
    ) {
        let keys = self.next_keys();
        let depth = base.len();
        debug_assert_eq!(1 << depth, out.len());
        let mut level = vec![seed];
        for bc in base {
            let mut children = vec![Block::ZERO; 2 * level.len()];
            keys.expander.expand_level(&level, &mut children);
            let (mut left, mut right) = (Block::ZERO, Block::ZERO);
            for pair in children.chunks_exact(2) {
                left ^= pair[0];
                right ^= pair[1];
            }
            msg.push(keys.layer_hash.cr_hash_block(*bc) ^ left);
            msg.push(keys.layer_hash.cr_hash_block(*bc ^ delta) ^ right);
            level = children;
        }
        let mut total = delta;
        for (out, leaf) in out.iter_mut().zip(level) {
            *out = leaf & Block::MASK_LSB;
            total ^= *out;
        }
        msg.push(total);
    }

    /// Rebuilds the leaves from the sender's `msg` into `out` and returns the
    /// punctured index.
    ///
    /// `base` holds one RCOT receiver block per layer. The choice bits of
    /// these blocks select the path to the punctured leaf.
    pub(super) fn receive_tree(&mut self, base: &[Block], msg: &[Block], out: &mut [Block]) -> usize {
        let keys = self.next_keys();
        let depth = base.len();
        debug_assert_eq!(message_len(depth), msg.len());
        debug_assert_eq!(1 << depth, out.len());
        let mut level = vec![Block::ZERO];
        let mut punctured = 0;
        for (layer, m) in base.iter().enumerate() {
            let mut children = vec![Block::ZERO; 2 * level.len()];
            keys.expander.expand_level(&level, &mut children);
            children[2 * punctured] = Block::ZERO;
            children[2 * punctured + 1] = Block::ZERO;

            let c = m.lsb() as usize;
            let mut side_sum = keys.layer_hash.cr_hash_block(*m) ^ msg[2 * layer + c];
            for child in children.iter().skip(c).step_by(2) {
                side_sum ^= *child;
            }
            children[2 * punctured + c] = side_sum;
            punctured = 2 * punctured + (1 - c);
            level = children;
        }
        let mut known = msg[2 * depth];
        for (i, (out, leaf)) in out.iter_mut().zip(level).enumerate() {
            if i != punctured {
                *out = leaf & Block::MASK_LSB;
                known ^= *out;
            }
        }
        out[punctured] = known;
        punctured
    }
}
