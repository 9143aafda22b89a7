//! Sparse random matrix for the LPN step of FERRET.
use crate::{block::Block, crypto::Prg};

/// Non-zero entries per output.
const LOCALITY: usize = 10;

/// A random matrix with [`LOCALITY`] non-zero entries per row, derived from a seed.
pub(super) struct TenLocalMatrix {
    seed: Block,
}

impl TenLocalMatrix {
    pub(super) fn new(seed: Block) -> Self {
        Self { seed }
    }

    /// XORs `A * src` into `out`.
    pub(super) fn multiply_into(&self, src: &[Block], out: &mut [Block]) {
        let n = src.len();
        if n == 0 {
            return;
        }
        let mut mask: usize = 1;
        while mask < n {
            mask = (mask << 1) | 1;
        }
        let mut prg = Prg::new(self.seed);
        for out in out.iter_mut() {
            for _ in 0..LOCALITY {
                let mut idx = prg.next_u32() as usize & mask;
                if idx >= n {
                    idx -= n;
                }
                *out ^= src[idx];
            }
        }
    }
}
