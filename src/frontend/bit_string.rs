use crate::{Error, frontend::Bit, scheduler::Scheduler};

/// A batch of bit strings of the same length.
///
/// Inputs and outputs hold one string per lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    bits: Vec<Bit>,
}

/// Turns one string per lane into one lane vector per bit position.
fn by_position(values: &[Vec<bool>]) -> Result<Vec<Vec<bool>>, Error> {
    let len = values.first().map_or(0, Vec::len);
    if let Some(other) = values.iter().find(|v| v.len() != len) {
        return Err(Error::Construction(format!(
            "bit strings of {len} and {} bits in one batch",
            other.len()
        )));
    }
    Ok((0..len)
        .map(|i| values.iter().map(|v| v[i]).collect())
        .collect())
}

fn by_lane(positions: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let lanes = positions.first().map_or(0, Vec::len);
    (0..lanes)
        .map(|lane| positions.iter().map(|p| p[lane]).collect())
        .collect()
}

impl BitString {
    /// The bits in input order.
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    /// The number of bits of every string.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the strings have no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// One secret string per lane, known to `owner`.
    pub async fn private_input<S: Scheduler>(
        s: &mut S,
        owner: usize,
        values: &[Vec<bool>],
    ) -> Result<Self, Error> {
        let mut bits = Vec::new();
        for position in by_position(values)? {
            bits.push(Bit::private_input(s, owner, &position).await?);
        }
        Ok(Self { bits })
    }

    /// One public string per lane.
    pub fn public_input<S: Scheduler>(s: &mut S, values: &[Vec<bool>]) -> Result<Self, Error> {
        let bits = by_position(values)?
            .iter()
            .map(|position| Bit::public_input(s, position))
            .collect();
        Ok(Self { bits })
    }

    /// A secret string made from the shares returned by
    /// [`BitString::extract_string_share`].
    pub async fn from_extracted<S: Scheduler>(
        s: &mut S,
        shares: &[Vec<bool>],
    ) -> Result<Self, Error> {
        let mut bits = Vec::new();
        for position in by_position(shares)? {
            bits.push(Bit::from_extracted(s, &position).await?);
        }
        Ok(Self { bits })
    }

    /// A public string holding the value at `party` and zeros elsewhere.
    pub async fn open_to_party<S: Scheduler>(
        &self,
        s: &mut S,
        party: usize,
    ) -> Result<Self, Error> {
        let mut bits = Vec::with_capacity(self.len());
        for bit in &self.bits {
            bits.push(bit.open_to_party(s, party).await?);
        }
        Ok(Self { bits })
    }

    /// The strings of a public value, one per lane.
    pub async fn value<S: Scheduler>(&self, s: &mut S) -> Result<Vec<Vec<bool>>, Error> {
        let mut positions = Vec::with_capacity(self.len());
        for bit in &self.bits {
            positions.push(bit.value(s).await?);
        }
        Ok(by_lane(&positions))
    }

    /// This party's shares, one string per lane.
    pub async fn extract_string_share<S: Scheduler>(
        &self,
        s: &mut S,
    ) -> Result<Vec<Vec<bool>>, Error> {
        let mut positions = Vec::with_capacity(self.len());
        for bit in &self.bits {
            positions.push(bit.extract_bit(s).await?);
        }
        Ok(by_lane(&positions))
    }

    /// Lanes are carried by the bits, so a string without bits can not be
    /// regrouped.
    fn check_not_empty(&self, op: &str) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::Construction(format!("{op} of a bit string without bits")));
        }
        Ok(())
    }

    fn check_len(&self, op: &str, other: &Self) -> Result<(), Error> {
        if self.len() != other.len() {
            return Err(Error::RuntimeType(format!(
                "{op} of bit strings of {} and {} bits",
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }

    /// Bitwise XOR.
    pub fn xor<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        self.check_len("XOR", other)?;
        let bits = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| a.xor(s, b))
            .collect::<Result<_, _>>()?;
        Ok(Self { bits })
    }

    /// `other` in the lanes where `choice` is set, `self` elsewhere.
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
        self.check_len("MUX", other)?;
        let mut bits = Vec::with_capacity(self.len());
        for (a, b) in self.bits.iter().zip(&other.bits) {
            bits.push(a.mux(s, choice, b).await?);
        }
        Ok(Self { bits })
    }

    /// Multiplexes all bits with one composite AND gate.
    pub async fn fast_mux<S: Scheduler>(
        &self,
        s: &mut S,
        choice: &Bit,
        other: &Self,
    ) -> Result<Self, Error> {
        let diffs = other.xor(s, self)?;
        let selected = choice.composite_and(s, &diffs.bits).await?;
        let bits = self
            .bits
            .iter()
            .zip(&selected)
            .map(|(a, sel)| a.xor(s, sel))
            .collect::<Result<_, _>>()?;
        diffs.release(s)?;
        selected.iter().try_for_each(|bit| bit.release(s))?;
        Ok(Self { bits })
    }

    /// The lanes of `self` followed by the lanes of `others`. Fails for
    /// strings without bits.
    pub fn batching_with<S: Scheduler>(&self, s: &mut S, others: &[Self]) -> Result<Self, Error> {
        self.check_not_empty("batching")?;
        for other in others {
            self.check_len("batching", other)?;
        }
        let bits = self
            .bits
            .iter()
            .enumerate()
            .map(|(i, bit)| {
                let rest: Vec<Bit> = others.iter().map(|o| o.bits[i]).collect();
                bit.batching_with(s, &rest)
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { bits })
    }

    /// Splits the lanes into strings of `sizes` lanes. Fails for strings
    /// without bits.
    pub fn unbatching<S: Scheduler>(
        &self,
        s: &mut S,
        sizes: &[usize],
    ) -> Result<Vec<Self>, Error> {
        self.check_not_empty("unbatching")?;
        let mut parts = vec![Vec::with_capacity(self.len()); sizes.len()];
        for bit in &self.bits {
            for (part, piece) in parts.iter_mut().zip(bit.unbatching(s, sizes)?) {
                part.push(piece);
            }
        }
        Ok(parts.into_iter().map(|bits| Self { bits }).collect())
    }

    /// The number of lanes. Strings without bits have no lanes to count.
    pub fn lanes<S: Scheduler>(&self, s: &S) -> Result<usize, Error> {
        match self.bits.first() {
            Some(bit) => bit.lanes(s),
            None => Err(Error::Construction(
                "a bit string without bits has no lanes".into(),
            )),
        }
    }

    /// Drops the wires of all bits.
    pub fn release<S: Scheduler>(self, s: &mut S) -> Result<(), Error> {
        self.bits.iter().try_for_each(|bit| bit.release(s))
    }
}
