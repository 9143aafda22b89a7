//! Length doubling PRG for GGM trees.
use crate::{block::Block, crypto::AesHash};

/// Maps a node of a GGM tree to its two children.
///
/// Each child is the correlation robust hash of the parent under one of two
/// fixed keys derived from `index`, so trees with different indices use
/// independent expansions.
#[derive(Clone)]
pub(crate) struct Expander {
    left: AesHash,
    right: AesHash,
}

impl Expander {
    pub(crate) fn new(index: u64) -> Self {
        Self {
            left: AesHash::with_block_key(Block::pack(1, index)),
            right: AesHash::with_block_key(Block::pack(2, index)),
        }
    }

    /// Expands every node of `parents` into `children`, which must be twice as long.
    pub(crate) fn expand_level(&self, parents: &[Block], children: &mut [Block]) {
        debug_assert_eq!(parents.len() * 2, children.len());
        for (i, parent) in parents.iter().enumerate() {
            children[2 * i] = self.left.cr_hash_block(*parent);
            children[2 * i + 1] = self.right.cr_hash_block(*parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_is_deterministic_per_index() {
        let parents = [Block::pack(3, 9), Block::pack(8, 1)];
        let mut a = [Block::ZERO; 4];
        let mut b = [Block::ZERO; 4];
        let mut c = [Block::ZERO; 4];
        Expander::new(5).expand_level(&parents, &mut a);
        Expander::new(5).expand_level(&parents, &mut b);
        Expander::new(6).expand_level(&parents, &mut c);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a[0], a[1]);
    }
}
