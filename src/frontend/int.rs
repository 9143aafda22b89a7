use crate::{Error, frontend::Bit, scheduler::Scheduler};

/// A batch of `WIDTH`-bit integers in two's complement.
///
/// Bits are stored least significant first, one [`Bit`] per position, so an
/// integer of `n` lanes is `WIDTH` wires of `n` lanes each. Arithmetic wraps
/// around at `WIDTH` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Int<const WIDTH: usize, const SIGNED: bool> {
    bits: Vec<Bit>,
}

/// A signed integer of `WIDTH` bits.
pub type SignedInt<const WIDTH: usize> = Int<WIDTH, true>;

/// An unsigned integer of `WIDTH` bits.
pub type UnsignedInt<const WIDTH: usize> = Int<WIDTH, false>;

fn release_all<S: Scheduler>(s: &mut S, bits: &[Bit]) -> Result<(), Error> {
    bits.iter().try_for_each(|bit| bit.release(s))
}

impl<const WIDTH: usize, const SIGNED: bool> Int<WIDTH, SIGNED> {
    const VALID_WIDTH: () = assert!(WIDTH >= 1 && WIDTH <= 64, "integers have 1 to 64 bits");

    const MASK: u64 = if WIDTH >= 64 {
        u64::MAX
    } else {
        (1 << WIDTH) - 1
    };

    fn from_bits(bits: Vec<Bit>) -> Self {
        let () = Self::VALID_WIDTH;
        debug_assert_eq!(bits.len(), WIDTH);
        Self { bits }
    }

    /// The bits, least significant first.
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// The values of every bit position, least significant first.
    fn split(raw: &[u64]) -> Vec<Vec<bool>> {
        (0..WIDTH)
            .map(|i| raw.iter().map(|v| (v >> i) & 1 == 1).collect())
            .collect()
    }

    fn join(bits: &[Vec<bool>]) -> Vec<u64> {
        let lanes = bits.first().map_or(0, Vec::len);
        (0..lanes)
            .map(|lane| {
                bits.iter()
                    .enumerate()
                    .fold(0, |acc, (i, b)| acc | ((b[lane] as u64) << i))
            })
            .collect()
    }

    async fn private_raw<S: Scheduler>(
        s: &mut S,
        owner: usize,
        raw: &[u64],
    ) -> Result<Self, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for values in Self::split(raw) {
            bits.push(Bit::private_input(s, owner, &values).await?);
        }
        Ok(Self::from_bits(bits))
    }

    fn public_raw<S: Scheduler>(s: &mut S, raw: &[u64]) -> Self {
        let bits = Self::split(raw)
            .iter()
            .map(|values| Bit::public_input(s, values))
            .collect();
        Self::from_bits(bits)
    }

    async fn raw_value<S: Scheduler>(&self, s: &mut S) -> Result<Vec<u64>, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for bit in &self.bits {
            bits.push(bit.value(s).await?);
        }
        Ok(Self::join(&bits))
    }

    /// The same value in every one of `lanes` lanes.
    pub fn constant<S: Scheduler>(s: &mut S, value: u64, lanes: usize) -> Self {
        Self::public_raw(s, &vec![value & Self::MASK; lanes])
    }

    /// A secret integer made from the shares returned by
    /// [`Int::extract_int_share`].
    pub async fn from_extracted<S: Scheduler>(s: &mut S, shares: &[u64]) -> Result<Self, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for values in Self::split(shares) {
            bits.push(Bit::from_extracted(s, &values).await?);
        }
        Ok(Self::from_bits(bits))
    }

    /// This party's XOR shares of the bits, packed into one word per lane.
    pub async fn extract_int_share<S: Scheduler>(&self, s: &mut S) -> Result<Vec<u64>, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for bit in &self.bits {
            bits.push(bit.extract_bit(s).await?);
        }
        Ok(Self::join(&bits))
    }

    /// A public integer holding the value at `party` and zeros elsewhere.
    pub async fn open_to_party<S: Scheduler>(
        &self,
        s: &mut S,
        party: usize,
    ) -> Result<Self, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for bit in &self.bits {
            bits.push(bit.open_to_party(s, party).await?);
        }
        Ok(Self::from_bits(bits))
    }

    /// Ripple-carry addition with one AND gate per bit.
    pub async fn add<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        let (a, b) = (&self.bits, &other.bits);
        let mut sum = Vec::with_capacity(WIDTH);
        sum.push(a[0].xor(s, &b[0])?);
        if WIDTH == 1 {
            return Ok(Self::from_bits(sum));
        }
        let mut carry = a[0].and(s, &b[0]).await?;
        for i in 1..WIDTH {
            let left = carry.xor(s, &a[i])?;
            sum.push(left.xor(s, &b[i])?);
            if i + 1 < WIDTH {
                let right = carry.xor(s, &b[i])?;
                let both = left.and(s, &right).await?;
                let next = both.xor(s, &carry)?;
                release_all(s, &[right, both, carry])?;
                carry = next;
            }
            left.release(s)?;
        }
        carry.release(s)?;
        Ok(Self::from_bits(sum))
    }

    /// Subtraction with a ripple borrow.
    pub async fn sub<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        let (a, b) = (&self.bits, &other.bits);
        let mut difference = Vec::with_capacity(WIDTH);
        difference.push(a[0].xor(s, &b[0])?);
        if WIDTH == 1 {
            return Ok(Self::from_bits(difference));
        }
        let not_a = a[0].not(s)?;
        let mut borrow = not_a.and(s, &b[0]).await?;
        not_a.release(s)?;
        for i in 1..WIDTH {
            let tmp = borrow.xor(s, &b[i])?;
            difference.push(a[i].xor(s, &tmp)?);
            if i + 1 < WIDTH {
                let diff = a[i].xor(s, &b[i])?;
                let flip = diff.and(s, &tmp).await?;
                let next = borrow.xor(s, &flip)?;
                release_all(s, &[diff, flip, borrow])?;
                borrow = next;
            }
            tmp.release(s)?;
        }
        borrow.release(s)?;
        Ok(Self::from_bits(difference))
    }

    /// Two's complement negation.
    pub async fn neg<S: Scheduler>(&self, s: &mut S) -> Result<Self, Error> {
        let lanes = self.lanes(s)?;
        let zero = Self::constant(s, 0, lanes);
        let negated = zero.sub(s, self).await?;
        zero.release(s)?;
        Ok(negated)
    }

    /// Set in the lanes where `self < other`.
    pub async fn lt<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        let (a, b) = (&self.bits, &other.bits);
        if WIDTH == 1 {
            let (x, y) = if SIGNED { (&b[0], &a[0]) } else { (&a[0], &b[0]) };
            let not_x = x.not(s)?;
            let less = not_x.and(s, y).await?;
            not_x.release(s)?;
            return Ok(less);
        }
        let not_a = a[0].not(s)?;
        let mut borrow = not_a.and(s, &b[0]).await?;
        not_a.release(s)?;
        for i in 1..WIDTH {
            let x = borrow.xor(s, &a[i])?;
            let y = borrow.xor(s, &b[i])?;
            let both = x.and(s, &y).await?;
            // the sign bit of `a` decides when the signs differ
            let last = if SIGNED && i + 1 == WIDTH { &a[i] } else { &b[i] };
            let next = both.xor(s, last)?;
            release_all(s, &[x, y, both, borrow])?;
            borrow = next;
        }
        Ok(borrow)
    }

    /// Set in the lanes where `self <= other`.
    pub async fn le<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        let greater = other.lt(s, self).await?;
        let le = greater.not(s)?;
        greater.release(s)?;
        Ok(le)
    }

    /// Set in the lanes where `self > other`.
    pub async fn gt<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        other.lt(s, self).await
    }

    /// Set in the lanes where `self >= other`.
    pub async fn ge<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        let less = self.lt(s, other).await?;
        let ge = less.not(s)?;
        less.release(s)?;
        Ok(ge)
    }

    /// Set in the lanes where both integers are equal. Uses a tree of AND
    /// gates of depth `log2(WIDTH)`.
    pub async fn eq<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        let mut layer = Vec::with_capacity(WIDTH);
        for (a, b) in self.bits.iter().zip(&other.bits) {
            let diff = a.xor(s, b)?;
            layer.push(diff.not(s)?);
            diff.release(s)?;
        }
        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len().div_ceil(2));
            let mut iter = layer.into_iter();
            while let Some(x) = iter.next() {
                match iter.next() {
                    Some(y) => {
                        next.push(x.and(s, &y).await?);
                        release_all(s, &[x, y])?;
                    }
                    None => next.push(x),
                }
            }
            layer = next;
        }
        layer
            .pop()
            .ok_or_else(|| Error::Construction("comparison of integers without bits".into()))
    }

    /// Set in the lanes where the integers differ.
    pub async fn ne<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Bit, Error> {
        let eq = self.eq(s, other).await?;
        let ne = eq.not(s)?;
        eq.release(s)?;
        Ok(ne)
    }

    /// `other` in the lanes where `choice` is set, `self` elsewhere.
    ///
    /// Uses [`Int::fast_mux`] with the `composite-mux` feature and
    /// [`Int::slow_mux`] otherwise.
    pub async fn mux<S: Scheduler>(
        &self,
        s: &mut S,
        choice: &Bit,
        other: &Self,
    ) -> Result<Self, Error> {
        if cfg!(feature = "composite-mux") {
            self.fast_mux(s, choice, other).await
        } else {
            self.slow_mux(s, choice, other).await
        }
    }

    /// Multiplexes every bit with its own AND gate.
    pub async fn slow_mux<S: Scheduler>(
        &self,
        s: &mut S,
        choice: &Bit,
        other: &Self,
    ) -> Result<Self, Error> {
        let mut bits = Vec::with_capacity(WIDTH);
        for (a, b) in self.bits.iter().zip(&other.bits) {
            bits.push(a.mux(s, choice, b).await?);
        }
        Ok(Self::from_bits(bits))
    }

    /// Multiplexes all bits with one composite AND gate.
    pub async fn fast_mux<S: Scheduler>(
        &self,
        s: &mut S,
        choice: &Bit,
        other: &Self,
    ) -> Result<Self, Error> {
        let diffs = other
            .bits
            .iter()
            .zip(&self.bits)
            .map(|(b, a)| b.xor(s, a))
            .collect::<Result<Vec<_>, _>>()?;
        let selected = choice.composite_and(s, &diffs).await?;
        let bits = self
            .bits
            .iter()
            .zip(&selected)
            .map(|(a, sel)| a.xor(s, sel))
            .collect::<Result<Vec<_>, _>>()?;
        release_all(s, &diffs)?;
        release_all(s, &selected)?;
        Ok(Self::from_bits(bits))
    }

    /// The lanes of `self` followed by the lanes of `others`.
    pub fn batching_with<S: Scheduler>(&self, s: &mut S, others: &[Self]) -> Result<Self, Error> {
        let bits = (0..WIDTH)
            .map(|i| {
                let rest: Vec<Bit> = others.iter().map(|o| o.bits[i]).collect();
                self.bits[i].batching_with(s, &rest)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bits(bits))
    }

    /// Splits the lanes into integers of `sizes` lanes.
    pub fn unbatching<S: Scheduler>(
        &self,
        s: &mut S,
        sizes: &[usize],
    ) -> Result<Vec<Self>, Error> {
        let mut parts: Vec<Vec<Bit>> = vec![Vec::with_capacity(WIDTH); sizes.len()];
        for bit in &self.bits {
            for (part, piece) in parts.iter_mut().zip(bit.unbatching(s, sizes)?) {
                part.push(piece);
            }
        }
        Ok(parts.into_iter().map(Self::from_bits).collect())
    }

    /// The number of lanes.
    pub fn lanes<S: Scheduler>(&self, s: &S) -> Result<usize, Error> {
        self.bits[0].lanes(s)
    }

    /// Drops the wires of all bits.
    pub fn release<S: Scheduler>(self, s: &mut S) -> Result<(), Error> {
        release_all(s, &self.bits)
    }
}

impl<const WIDTH: usize> Int<WIDTH, true> {
    fn encode(values: &[i64]) -> Result<Vec<u64>, Error> {
        let min = if WIDTH >= 64 {
            i64::MIN
        } else {
            -(1i64 << (WIDTH - 1))
        };
        let max = if WIDTH >= 64 {
            i64::MAX
        } else {
            (1i64 << (WIDTH - 1)) - 1
        };
        values
            .iter()
            .map(|v| {
                if (min..=max).contains(v) {
                    Ok(*v as u64 & Self::MASK)
                } else {
                    Err(Error::RuntimeType(format!(
                        "{v} does not fit a signed integer of {WIDTH} bits"
                    )))
                }
            })
            .collect()
    }

    /// A secret integer per lane, known to `owner`. Other parties pass
    /// placeholders that fit the width.
    pub async fn private_input<S: Scheduler>(
        s: &mut S,
        owner: usize,
        values: &[i64],
    ) -> Result<Self, Error> {
        Self::private_raw(s, owner, &Self::encode(values)?).await
    }

    /// A public integer per lane.
    pub fn public_input<S: Scheduler>(s: &mut S, values: &[i64]) -> Result<Self, Error> {
        Ok(Self::public_raw(s, &Self::encode(values)?))
    }

    /// The lanes of a public integer.
    pub async fn value<S: Scheduler>(&self, s: &mut S) -> Result<Vec<i64>, Error> {
        let shift = 64 - WIDTH;
        let raw = self.raw_value(s).await?;
        Ok(raw
            .into_iter()
            .map(|v| ((v << shift) as i64) >> shift)
            .collect())
    }
}

impl<const WIDTH: usize> Int<WIDTH, false> {
    fn encode(values: &[u64]) -> Result<Vec<u64>, Error> {
        match values.iter().find(|v| **v & !Self::MASK != 0) {
            Some(v) => Err(Error::RuntimeType(format!(
                "{v} does not fit an unsigned integer of {WIDTH} bits"
            ))),
            None => Ok(values.to_vec()),
        }
    }

    /// A secret integer per lane, known to `owner`. Other parties pass
    /// placeholders that fit the width.
    pub async fn private_input<S: Scheduler>(
        s: &mut S,
        owner: usize,
        values: &[u64],
    ) -> Result<Self, Error> {
        Self::private_raw(s, owner, &Self::encode(values)?).await
    }

    /// A public integer per lane.
    pub fn public_input<S: Scheduler>(s: &mut S, values: &[u64]) -> Result<Self, Error> {
        Ok(Self::public_raw(s, &Self::encode(values)?))
    }

    /// The lanes of a public integer.
    pub async fn value<S: Scheduler>(&self, s: &mut S) -> Result<Vec<u64>, Error> {
        self.raw_value(s).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::PlaintextScheduler;

    /// Every pair of values from `range`, one pair per lane.
    fn all_pairs(range: std::ops::Range<i64>) -> (Vec<i64>, Vec<i64>) {
        range
            .clone()
            .flat_map(|a| range.clone().map(move |b| (a, b)))
            .unzip()
    }

    #[tokio::test]
    async fn signed_arithmetic_is_exhaustively_correct() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let (xs, ys) = all_pairs(-8..8);
        let a = SignedInt::<4>::private_input(&mut s, 0, &xs).await.unwrap();
        let b = SignedInt::<4>::private_input(&mut s, 1, &ys).await.unwrap();
        let wrap = |v: i64| (v << 60) >> 60;

        let sum = a.add(&mut s, &b).await.unwrap();
        let difference = a.sub(&mut s, &b).await.unwrap();
        let negated = a.neg(&mut s).await.unwrap();
        let less = a.lt(&mut s, &b).await.unwrap();
        let at_most = a.le(&mut s, &b).await.unwrap();
        let equal = a.eq(&mut s, &b).await.unwrap();
        for (int, expected) in [
            (sum, xs.iter().zip(&ys).map(|(x, y)| wrap(x + y)).collect::<Vec<_>>()),
            (difference, xs.iter().zip(&ys).map(|(x, y)| wrap(x - y)).collect()),
            (negated, xs.iter().map(|x| wrap(-x)).collect()),
        ] {
            let opened = int.open_to_party(&mut s, 0).await.unwrap();
            assert_eq!(opened.value(&mut s).await.unwrap(), expected);
        }
        for (bit, expected) in [
            (less, xs.iter().zip(&ys).map(|(x, y)| x < y).collect::<Vec<_>>()),
            (at_most, xs.iter().zip(&ys).map(|(x, y)| x <= y).collect()),
            (equal, xs.iter().zip(&ys).map(|(x, y)| x == y).collect()),
        ] {
            assert_eq!(bit.extract_bit(&mut s).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn unsigned_comparisons_are_exhaustively_correct() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let (xs, ys) = all_pairs(0..16);
        let (xs, ys): (Vec<u64>, Vec<u64>) = (
            xs.into_iter().map(|v| v as u64).collect(),
            ys.into_iter().map(|v| v as u64).collect(),
        );
        let a = UnsignedInt::<4>::private_input(&mut s, 0, &xs).await.unwrap();
        let b = UnsignedInt::<4>::private_input(&mut s, 1, &ys).await.unwrap();
        let greater = a.gt(&mut s, &b).await.unwrap();
        let at_least = a.ge(&mut s, &b).await.unwrap();
        let differ = a.ne(&mut s, &b).await.unwrap();
        let expected = |f: fn(&u64, &u64) -> bool| -> Vec<bool> {
            xs.iter().zip(&ys).map(|(x, y)| f(x, y)).collect()
        };
        assert_eq!(greater.extract_bit(&mut s).await.unwrap(), expected(|x, y| x > y));
        assert_eq!(at_least.extract_bit(&mut s).await.unwrap(), expected(|x, y| x >= y));
        assert_eq!(differ.extract_bit(&mut s).await.unwrap(), expected(|x, y| x != y));
    }

    #[tokio::test]
    async fn single_bit_integers_compare() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let a = SignedInt::<1>::public_input(&mut s, &[0, 0, -1, -1]).unwrap();
        let b = SignedInt::<1>::public_input(&mut s, &[0, -1, 0, -1]).unwrap();
        let less = a.lt(&mut s, &b).await.unwrap();
        assert_eq!(less.value(&mut s).await.unwrap(), vec![false, false, true, false]);

        let a = UnsignedInt::<1>::public_input(&mut s, &[0, 0, 1, 1]).unwrap();
        let b = UnsignedInt::<1>::public_input(&mut s, &[0, 1, 0, 1]).unwrap();
        let less = a.lt(&mut s, &b).await.unwrap();
        assert_eq!(less.value(&mut s).await.unwrap(), vec![false, true, false, false]);
        let sum = a.add(&mut s, &b).await.unwrap();
        assert_eq!(sum.value(&mut s).await.unwrap(), vec![0, 1, 1, 0]);
    }

    #[tokio::test]
    async fn mux_strategies_agree() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let a = UnsignedInt::<8>::private_input(&mut s, 0, &[1, 2, 3, 255])
            .await
            .unwrap();
        let b = UnsignedInt::<8>::public_input(&mut s, &[10, 20, 30, 40]).unwrap();
        let choice = Bit::private_input(&mut s, 1, &[true, false, true, false])
            .await
            .unwrap();
        let expected = vec![10, 2, 30, 255];
        let slow = a.slow_mux(&mut s, &choice, &b).await.unwrap();
        let fast = a.fast_mux(&mut s, &choice, &b).await.unwrap();
        let default = a.mux(&mut s, &choice, &b).await.unwrap();
        for int in [slow, fast, default] {
            assert_eq!(int.extract_int_share(&mut s).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn mux_and_or_release_their_temporaries() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let a = UnsignedInt::<8>::private_input(&mut s, 0, &[1, 2, 3, 255])
            .await
            .unwrap();
        let b = UnsignedInt::<8>::public_input(&mut s, &[10, 20, 30, 40]).unwrap();
        let choice = Bit::private_input(&mut s, 1, &[true, false, true, false])
            .await
            .unwrap();
        let live = |s: &PlaintextScheduler| {
            let stats = s.wire_statistics();
            stats.allocated - stats.deallocated
        };
        let before = live(&s);

        let slow = a.slow_mux(&mut s, &choice, &b).await.unwrap();
        assert_eq!(live(&s), before + 8);
        slow.release(&mut s).unwrap();
        let fast = a.fast_mux(&mut s, &choice, &b).await.unwrap();
        fast.release(&mut s).unwrap();
        let default = a.mux(&mut s, &choice, &b).await.unwrap();
        default.release(&mut s).unwrap();
        let not = choice.not(&mut s).unwrap();
        let or = choice.or(&mut s, &not).await.unwrap();
        assert_eq!(live(&s), before + 2);
        assert_eq!(or.extract_bit(&mut s).await.unwrap(), vec![true; 4]);
        or.release(&mut s).unwrap();
        not.release(&mut s).unwrap();
        assert_eq!(live(&s), before);
    }

    #[tokio::test]
    async fn inputs_must_fit_the_width() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        assert!(matches!(
            UnsignedInt::<8>::public_input(&mut s, &[256]),
            Err(Error::RuntimeType(_))
        ));
        assert!(matches!(
            SignedInt::<8>::private_input(&mut s, 0, &[-129]).await,
            Err(Error::RuntimeType(_))
        ));
        let max = SignedInt::<64>::public_input(&mut s, &[i64::MIN, i64::MAX]).unwrap();
        assert_eq!(max.value(&mut s).await.unwrap(), vec![i64::MIN, i64::MAX]);
    }

    #[tokio::test]
    async fn batches_split_and_merge() {
        let mut s = PlaintextScheduler::new(0, 2).unwrap();
        let a = UnsignedInt::<16>::public_input(&mut s, &[1, 2]).unwrap();
        let b = UnsignedInt::<16>::public_input(&mut s, &[3]).unwrap();
        let c = UnsignedInt::<16>::public_input(&mut s, &[4, 5, 6]).unwrap();
        let batch = a.batching_with(&mut s, &[b, c]).unwrap();
        assert_eq!(batch.lanes(&s).unwrap(), 6);
        assert_eq!(batch.value(&mut s).await.unwrap(), vec![1, 2, 3, 4, 5, 6]);
        let parts = batch.unbatching(&mut s, &[4, 2]).unwrap();
        assert_eq!(parts[0].value(&mut s).await.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(parts[1].value(&mut s).await.unwrap(), vec![5, 6]);
        assert!(matches!(
            batch.unbatching(&mut s, &[4]),
            Err(Error::Construction(_))
        ));
    }
}
