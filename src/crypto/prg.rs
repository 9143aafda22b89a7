//! Seeded pseudorandom generator used for shared masks and local randomness.
use rand::{Rng, RngCore, SeedableRng};

use crate::{block::Block, crypto::AesRng, utils::unpack_bits};

/// Expands a [`Block`] seed into bits, integers and blocks.
///
/// Two `Prg`s created from the same seed return the same values for the same
/// sequence of calls.
#[derive(Debug, Clone)]
pub(crate) struct Prg(AesRng);

impl Prg {
    pub(crate) fn new(seed: Block) -> Self {
        Self(AesRng::from_seed(seed))
    }

    /// A `Prg` seeded from the thread-local entropy source.
    pub(crate) fn from_entropy() -> Self {
        Self(AesRng::new())
    }

    pub(crate) fn random_bits(&mut self, n: usize) -> Vec<bool> {
        let bytes = self.random_bytes(n.div_ceil(8));
        unpack_bits(&bytes, n)
    }

    fn random_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0; n];
        self.0.fill_bytes(&mut bytes);
        bytes
    }

    pub(crate) fn random_u64s(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.0.next_u64()).collect()
    }

    pub(crate) fn random_blocks(&mut self, n: usize) -> Vec<Block> {
        let mut blocks = vec![Block::ZERO; n];
        self.0.fill_bytes(bytemuck::cast_slice_mut(&mut blocks));
        blocks
    }

    pub(crate) fn random_block(&mut self) -> Block {
        self.0.random()
    }

    pub(crate) fn random_bool(&mut self) -> bool {
        self.0.next_u32() & 1 == 1
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let seed = Block::pack(42, 4242);
        let mut a = Prg::new(seed);
        let mut b = Prg::new(seed);
        assert_eq!(a.random_bits(1001), b.random_bits(1001));
        assert_eq!(a.random_u64s(17), b.random_u64s(17));
        assert_eq!(a.random_blocks(9), b.random_blocks(9));
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = Prg::new(Block::pack(1, 0));
        let mut b = Prg::new(Block::pack(2, 0));
        assert_ne!(a.random_u64s(4), b.random_u64s(4));
    }

    #[test]
    fn random_bits_has_requested_length() {
        let mut prg = Prg::from_entropy();
        assert_eq!(0, prg.random_bits(0).len());
        assert_eq!(13, prg.random_bits(13).len());
    }
}
