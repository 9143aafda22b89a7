use std::ops::BitXorAssign;

mod rand_compat;

pub(crate) use rand_compat::RngCompat;

pub(crate) fn xor_inplace<T: Copy + BitXorAssign>(a: &mut [T], b: &[T]) {
    a.iter_mut().zip(b).for_each(|(a, b)| {
        *a ^= *b;
    });
}

/// Packs bools into bytes, least significant bit first.
#[inline]
pub(crate) fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, b) in bits.iter().enumerate() {
        bytes[i / 8] |= (*b as u8) << (i % 8);
    }
    bytes
}

/// Unpacks the first `len` bits of `bytes`, least significant bit first.
#[inline]
pub(crate) fn unpack_bits(bytes: &[u8], len: usize) -> Vec<bool> {
    (0..len).map(|i| (bytes[i / 8] >> (i % 8)) & 1 == 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_bits() {
        let bits = vec![true, false, true, true, false, false, false, true, true, false, true];
        let packed = pack_bits(&bits);
        assert_eq!(2, packed.len());
        assert_eq!(0b1000_1101, packed[0]);
        assert_eq!(bits, unpack_bits(&packed, bits.len()));
    }

    #[test]
    fn xor_in_place() {
        let mut a = vec![0b1100_u8, 0xff];
        xor_inplace(&mut a, &[0b1010, 0x0f]);
        assert_eq!(vec![0b0110, 0xf0], a);
    }
}
