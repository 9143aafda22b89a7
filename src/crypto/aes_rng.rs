//! AES-128 in counter mode as a [`rand`] RNG.
use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};
use rand::{
    CryptoRng, RngCore, SeedableRng,
    rand_core::block::{BlockRng, BlockRngCore, CryptoBlockRng},
};

use crate::{block::Block, crypto::AES_PAR_BLOCKS};

/// Encrypts consecutive counter values, starting at `counter`, into `blocks`.
fn encrypt_counters(aes: &Aes128, counter: &mut u128, blocks: &mut [aes::Block]) {
    for block in blocks.iter_mut() {
        *block = aes::cipher::Array(counter.to_le_bytes());
        *counter = counter.wrapping_add(1);
    }
    aes.encrypt_blocks(blocks);
}

/// AES-128 keyed with the seed, encrypting a counter that starts at zero.
///
/// Equal seeds give equal streams for equal sequences of calls. `fill_bytes`
/// bypasses the word buffer for whole blocks.
#[derive(Clone)]
pub(crate) struct AesRng(BlockRng<CounterCore>);

impl std::fmt::Debug for AesRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesRng")
    }
}

impl AesRng {
    /// An RNG with a seed from the thread-local entropy source.
    pub(crate) fn new() -> Self {
        Self::from_seed(rand::random())
    }
}

impl RngCore for AesRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // whole blocks are encrypted in place, only the tail goes through the buffer
        let whole = dest.len() - dest.len() % Block::BYTES;
        let (blocks, tail) = dest.split_at_mut(whole);
        let blocks = bytemuck::cast_slice_mut::<u8, aes::Block>(blocks);
        let core = &mut self.0.core;
        for chunk in blocks.chunks_mut(AES_PAR_BLOCKS) {
            encrypt_counters(&core.aes, &mut core.counter, chunk);
        }
        self.0.fill_bytes(tail);
    }
}

impl SeedableRng for AesRng {
    type Seed = Block;

    fn from_seed(seed: Block) -> Self {
        Self(BlockRng::new(CounterCore {
            aes: Aes128::new(&seed.into()),
            counter: 0,
        }))
    }
}

impl CryptoRng for AesRng {}

#[derive(Clone)]
pub(crate) struct CounterCore {
    aes: Aes128,
    counter: u128,
}

/// Output of one [`CounterCore::generate`] call, [`AES_PAR_BLOCKS`] blocks
/// seen as words.
#[derive(Clone, Copy)]
pub(crate) struct ParBlocks([u32; AES_PAR_BLOCKS * 4]);

impl Default for ParBlocks {
    fn default() -> Self {
        Self([0; AES_PAR_BLOCKS * 4])
    }
}

impl AsRef<[u32]> for ParBlocks {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl AsMut<[u32]> for ParBlocks {
    fn as_mut(&mut self) -> &mut [u32] {
        &mut self.0
    }
}

impl BlockRngCore for CounterCore {
    type Item = u32;
    type Results = ParBlocks;

    fn generate(&mut self, results: &mut ParBlocks) {
        let blocks = bytemuck::cast_slice_mut::<u32, aes::Block>(&mut results.0);
        encrypt_counters(&self.aes, &mut self.counter, blocks);
    }
}

impl CryptoBlockRng for CounterCore {}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn equal_seeds_give_equal_streams() {
        let seed = Block::from(42_u128);
        let mut a = AesRng::from_seed(seed);
        let mut b = AesRng::from_seed(seed);
        let mut bytes_a = vec![0_u8; 16 * 13 + 5];
        let mut bytes_b = vec![0_u8; bytes_a.len()];
        a.fill_bytes(&mut bytes_a);
        b.fill_bytes(&mut bytes_b);
        assert_eq!(bytes_a, bytes_b);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn fill_bytes_matches_word_output() {
        let seed = Block::pack(3, 5);
        let mut words = AesRng::from_seed(seed);
        let mut bytes = AesRng::from_seed(seed);
        let expected: Vec<u8> = (0..AES_PAR_BLOCKS * 4)
            .flat_map(|_| words.next_u32().to_le_bytes())
            .collect();
        let mut filled = vec![0_u8; expected.len()];
        bytes.fill_bytes(&mut filled);
        assert_eq!(filled, expected);
    }

    #[test]
    fn fresh_rngs_differ() {
        let a: [Block; 4] = AesRng::new().random();
        let b: [Block; 4] = AesRng::new().random();
        assert_ne!(a, b);
    }
}
