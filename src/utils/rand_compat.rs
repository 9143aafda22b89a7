//! Lets `rand` 0.9 generators drive crates still on `rand_core` 0.6, such as
//! `curve25519-dalek`.
use rand::{CryptoRng, RngCore};

/// A `rand` 0.9 RNG exposed through the `rand_core` 0.6 traits.
pub(crate) struct RngCompat<R>(pub(crate) R);

impl<R: RngCore> rand_core_0_6::RngCore for RngCompat<R> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core_0_6::Error> {
        // 0.9 generators are infallible
        self.0.fill_bytes(dest);
        Ok(())
    }
}

impl<R: CryptoRng> rand_core_0_6::CryptoRng for RngCompat<R> {}
