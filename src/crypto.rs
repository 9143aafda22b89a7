//! AES based primitives: hashing, PRGs and the GGM tree expander.
mod aes_hash;
mod aes_rng;
mod expander;
mod prg;

pub(crate) use aes_hash::{AesHash, FIXED_KEY_HASH};
pub(crate) use aes_rng::AesRng;
pub(crate) use expander::Expander;
pub(crate) use prg::Prg;

/// Blocks encrypted per call, matching what the hardware AES backend of the
/// target pipelines. Only affects speed, never outputs.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) const AES_PAR_BLOCKS: usize = 9;
#[cfg(target_arch = "aarch64")]
pub(crate) const AES_PAR_BLOCKS: usize = 21;
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
pub(crate) const AES_PAR_BLOCKS: usize = 8;
