//! The 128-bit [`Block`], which is the unit of every OT key, PRG output and
//! AES hash in this crate.
use std::ops::{BitAnd, BitAndAssign, BitXor, BitXorAssign, Not};

use aes::cipher::{self, array::sizes};
use bytemuck::{Pod, Zeroable};
use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use wide::u8x16;

/// 128 bits, stored as a SIMD vector of bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(transparent)]
pub struct Block(u8x16);

impl Block {
    /// All bits unset.
    pub const ZERO: Self = Self(u8x16::ZERO);
    /// Every bit except the LSB. GGM leaves are masked with it so that the
    /// LSB of an RCOT key only depends on the choice bit.
    pub const MASK_LSB: Self = Self::pack(u64::MAX << 1, u64::MAX);
    /// Size in bytes.
    pub const BYTES: usize = 16;
    /// Size in bits.
    pub const BITS: usize = 128;

    /// A block holding `bytes`.
    #[inline]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(u8x16::new(bytes))
    }

    /// `low` in the first and `high` in the last eight bytes. Usable in const
    /// context, so fixed keys and seeds are written with it.
    pub const fn pack(low: u64, high: u64) -> Self {
        let (low, high) = (low.to_ne_bytes(), high.to_ne_bytes());
        let mut bytes = [0; 16];
        let mut i = 0;
        while i < 8 {
            bytes[i] = low[i];
            bytes[i + 8] = high[i];
            i += 1;
        }
        Self::new(bytes)
    }

    /// The bytes of the block.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_array_ref()
    }

    /// The first 64 bits.
    #[inline]
    pub fn low(&self) -> u64 {
        let words: [u64; 2] = bytemuck::must_cast(self.0);
        words[0]
    }

    /// The least significant bit, which carries the choice bit of an RCOT key.
    #[inline]
    pub fn lsb(&self) -> bool {
        self.as_bytes()[0] & 1 == 1
    }

    /// The block with its LSB replaced by `bit`.
    #[inline]
    pub fn with_lsb(self, bit: bool) -> Self {
        let mut bytes = *self.as_bytes();
        bytes[0] = (bytes[0] & !1) | u8::from(bit);
        Self::new(bytes)
    }

    /// `self` if `bit` is set and zero otherwise, without branching on `bit`.
    #[inline]
    pub fn const_mul(&self, bit: bool) -> Self {
        Self::conditional_select(&Self::ZERO, self, Choice::from(u8::from(bit)))
    }
}

impl BitAnd for Block {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Block {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}

impl BitXor for Block {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        *self = *self ^ rhs;
    }
}

impl Not for Block {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes()[..].ct_eq(&other.as_bytes()[..]).into()
    }
}

impl Eq for Block {}

impl ConditionallySelectable for Block {
    #[inline]
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mask = Self::new([choice.unwrap_u8().wrapping_neg(); 16]);
        *a ^ (mask & (*a ^ *b))
    }
}

impl Distribution<Block> for StandardUniform {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block::new(rng.random())
    }
}

impl From<Block> for cipher::Array<u8, sizes::U16> {
    #[inline]
    fn from(value: Block) -> Self {
        Self(*value.as_bytes())
    }
}

impl From<cipher::Array<u8, sizes::U16>> for Block {
    #[inline]
    fn from(value: cipher::Array<u8, sizes::U16>) -> Self {
        Self::new(value.0)
    }
}

impl AsRef<[u8]> for Block {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl AsMut<[u8]> for Block {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        bytemuck::bytes_of_mut(self)
    }
}

impl From<u128> for Block {
    #[inline]
    fn from(value: u128) -> Self {
        Self::new(value.to_ne_bytes())
    }
}

impl From<usize> for Block {
    #[inline]
    fn from(value: usize) -> Self {
        Self::from(value as u128)
    }
}

impl From<Block> for u128 {
    #[inline]
    fn from(value: Block) -> Self {
        u128::from_ne_bytes(*value.as_bytes())
    }
}
