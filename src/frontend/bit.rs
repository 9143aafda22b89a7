use crate::{
    Error,
    scheduler::{Boolean, Scheduler, WireId},
};

/// A batch of secret or public bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bit {
    wire: WireId<Boolean>,
}

impl Bit {
    pub(crate) fn from_wire(wire: WireId<Boolean>) -> Self {
        Self { wire }
    }

    /// The underlying scheduler wire.
    pub fn wire(&self) -> WireId<Boolean> {
        self.wire
    }

    /// A secret bit per lane, known to `owner`.
    pub async fn private_input<S: Scheduler>(
        s: &mut S,
        owner: usize,
        values: &[bool],
    ) -> Result<Self, Error> {
        Ok(Self::from_wire(s.private_boolean_input(owner, values).await?))
    }

    /// A public bit per lane.
    pub fn public_input<S: Scheduler>(s: &mut S, values: &[bool]) -> Self {
        Self::from_wire(s.public_boolean_input(values))
    }

    /// A secret bit made from the shares returned by [`Bit::extract_bit`].
    pub async fn from_extracted<S: Scheduler>(s: &mut S, shares: &[bool]) -> Result<Self, Error> {
        Ok(Self::from_wire(s.recover_boolean_wire(shares).await?))
    }

    /// Lane-wise AND.
    pub async fn and<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        Ok(Self::from_wire(s.and(self.wire, other.wire).await?))
    }

    /// Lane-wise OR, with one AND gate.
    pub async fn or<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        let and = s.and(self.wire, other.wire).await?;
        let xor = s.xor(self.wire, other.wire)?;
        let or = s.xor(xor, and)?;
        s.release_boolean(and)?;
        s.release_boolean(xor)?;
        Ok(Self::from_wire(or))
    }

    /// Lane-wise XOR.
    pub fn xor<S: Scheduler>(&self, s: &mut S, other: &Self) -> Result<Self, Error> {
        Ok(Self::from_wire(s.xor(self.wire, other.wire)?))
    }

    /// Lane-wise negation.
    pub fn not<S: Scheduler>(&self, s: &mut S) -> Result<Self, Error> {
        Ok(Self::from_wire(s.not(self.wire)?))
    }

    /// `other` in the lanes where `choice` is set, `self` elsewhere.
    pub async fn mux<S: Scheduler>(
        &self,
        s: &mut S,
        choice: &Self,
        other: &Self,
    ) -> Result<Self, Error> {
        let diff = s.xor(other.wire, self.wire)?;
        let selected = s.and(choice.wire, diff).await?;
        let output = s.xor(self.wire, selected)?;
        s.release_boolean(diff)?;
        s.release_boolean(selected)?;
        Ok(Self::from_wire(output))
    }

    /// `self & rights[i]` for every `i`, opening `self` only once.
    pub async fn composite_and<S: Scheduler>(
        &self,
        s: &mut S,
        rights: &[Self],
    ) -> Result<Vec<Self>, Error> {
        let rights: Vec<_> = rights.iter().map(|r| r.wire).collect();
        let outputs = s.composite_and(self.wire, &rights).await?;
        Ok(outputs.into_iter().map(Self::from_wire).collect())
    }

    /// A public bit holding the value at `party` and zeros elsewhere.
    pub async fn open_to_party<S: Scheduler>(
        &self,
        s: &mut S,
        party: usize,
    ) -> Result<Self, Error> {
        Ok(Self::from_wire(s.open_boolean_to_party(self.wire, party).await?))
    }

    /// The lanes of a public bit.
    pub async fn value<S: Scheduler>(&self, s: &mut S) -> Result<Vec<bool>, Error> {
        s.boolean_value(self.wire).await
    }

    /// This party's shares.
    pub async fn extract_bit<S: Scheduler>(&self, s: &mut S) -> Result<Vec<bool>, Error> {
        s.extract_boolean_share(self.wire).await
    }

    /// The lanes of `self` followed by the lanes of `others`.
    pub fn batching_with<S: Scheduler>(&self, s: &mut S, others: &[Self]) -> Result<Self, Error> {
        let wires: Vec<_> = std::iter::once(self.wire)
            .chain(others.iter().map(|o| o.wire))
            .collect();
        Ok(Self::from_wire(s.batching_boolean(&wires)?))
    }

    /// Splits the lanes into bits of `sizes` lanes.
    pub fn unbatching<S: Scheduler>(
        &self,
        s: &mut S,
        sizes: &[usize],
    ) -> Result<Vec<Self>, Error> {
        let wires = s.unbatching_boolean(self.wire, sizes)?;
        Ok(wires.into_iter().map(Self::from_wire).collect())
    }

    /// The number of lanes.
    pub fn lanes<S: Scheduler>(&self, s: &S) -> Result<usize, Error> {
        s.boolean_lanes(self.wire)
    }

    /// Drops the wire. Copies of this bit must not be used afterwards.
    pub fn release<S: Scheduler>(self, s: &mut S) -> Result<(), Error> {
        s.release_boolean(self.wire)
    }
}
