//! Correlation robust hashing with fixed-key AES, following
//! <https://eprint.iacr.org/2019/074>. Only secure against semi-honest
//! adversaries.
use std::sync::LazyLock;

use aes::{
    Aes128,
    cipher::{BlockCipherEncrypt, KeyInit},
};

use crate::{block::Block, crypto::AES_PAR_BLOCKS};

/// A keyed AES permutation `π` used as a hash.
#[derive(Clone)]
pub(crate) struct AesHash {
    aes: Aes128,
}

impl AesHash {
    pub(crate) fn with_block_key(key: Block) -> Self {
        Self {
            aes: Aes128::new(&key.into()),
        }
    }

    fn permute(&self, x: Block) -> Block {
        let mut block = x.into();
        self.aes.encrypt_block(&mut block);
        block.into()
    }

    /// `π(x) ^ x`.
    pub(crate) fn cr_hash_block(&self, x: Block) -> Block {
        self.permute(x) ^ x
    }

    /// `π(π(x) ^ tweak) ^ π(x)`.
    pub(crate) fn tccr_hash_block(&self, tweak: Block, x: Block) -> Block {
        let pi_x = self.permute(x);
        self.permute(pi_x ^ tweak) ^ pi_x
    }

    /// [`AesHash::tccr_hash_block`] of every `xs[i]` under `tweak(i)`, in place.
    /// Encrypts [`AES_PAR_BLOCKS`] blocks per AES call.
    pub(crate) fn tccr_hash_slice_mut(
        &self,
        xs: &mut [Block],
        mut tweak: impl FnMut(usize) -> Block,
    ) {
        let mut buffer = [aes::Block::default(); AES_PAR_BLOCKS];
        for (c, chunk) in xs.chunks_mut(AES_PAR_BLOCKS).enumerate() {
            let pi_x = &mut buffer[..chunk.len()];
            for (p, x) in pi_x.iter_mut().zip(chunk.iter()) {
                *p = (*x).into();
            }
            self.aes.encrypt_blocks(pi_x);
            for (i, (x, p)) in chunk.iter_mut().zip(pi_x.iter()).enumerate() {
                *x = Block::from(*p) ^ tweak(c * AES_PAR_BLOCKS + i);
            }
            self.aes.encrypt_blocks(bytemuck::cast_slice_mut(chunk));
            chunk
                .iter_mut()
                .zip(pi_x.iter())
                .for_each(|(x, p)| *x ^= Block::from(*p));
        }
    }
}

/// The hash used wherever both parties need the same function without
/// agreeing on a key first.
pub(crate) static FIXED_KEY_HASH: LazyLock<AesHash> = LazyLock::new(|| {
    AesHash::with_block_key(Block::pack(0x7e4c_2a91_d35b_0f68, 0x91a3_5e07_c2d8_4b16))
});
