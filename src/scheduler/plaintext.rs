use std::ops::{BitAnd, BitXor};

use tracing::debug;

use crate::{
    Error,
    agent::TrafficStats,
    scheduler::{
        Arithmetic, Boolean, GateStats, Scheduler, WireId, WireStats,
        wire_keeper::{StoredKind, WireKeeper},
    },
};

/// Computes on plaintext values without any communication.
///
/// Private inputs are taken as given, so every party has to pass the real
/// values of all inputs. Secrecy is still tracked, which makes this scheduler
/// reject the same programs as the secure ones and count the same gates.
#[derive(Debug)]
pub struct PlaintextScheduler {
    party_id: usize,
    num_parties: usize,
    wires: WireKeeper,
    statistics: GateStats,
}

impl PlaintextScheduler {
    /// A scheduler for `party_id` in a computation of `num_parties` parties.
    pub fn new(party_id: usize, num_parties: usize) -> Result<Self, Error> {
        if party_id >= num_parties {
            return Err(Error::Construction(format!(
                "party id {party_id} is out of range for {num_parties} parties"
            )));
        }
        debug!(party_id, num_parties, "plaintext scheduler created");
        Ok(Self {
            party_id,
            num_parties,
            wires: WireKeeper::default(),
            statistics: GateStats::default(),
        })
    }

    fn count(&mut self, free: bool, results: usize) {
        if free {
            self.statistics.free += results as u64;
        } else {
            self.statistics.non_free += results as u64;
        }
    }

    pub(crate) fn input<K: StoredKind>(&mut self, value: Vec<K::Value>, secret: bool) -> WireId<K> {
        let lanes = value.len();
        self.count(true, lanes);
        self.wires.allocate(Some(value), lanes, secret, 0)
    }

    pub(crate) fn check_party(&self, party: usize) -> Result<(), Error> {
        if party >= self.num_parties {
            return Err(Error::Construction(format!(
                "party {party} does not exist in a computation of {} parties",
                self.num_parties
            )));
        }
        Ok(())
    }

    pub(crate) fn value_of<K: StoredKind>(&self, wire: WireId<K>) -> Result<Vec<K::Value>, Error> {
        Ok(self.wires.value(wire)?.to_vec())
    }

    pub(crate) fn is_secret<K: StoredKind>(&self, wire: WireId<K>) -> Result<bool, Error> {
        self.wires.is_secret(wire)
    }

    /// Applies `op` lane-wise. `free` decides from the secret flags of both
    /// inputs whether the secure schedulers would need communication.
    fn binary<K: StoredKind>(
        &mut self,
        name: &str,
        left: WireId<K>,
        right: WireId<K>,
        free: fn(bool, bool) -> bool,
        op: impl Fn(K::Value, K::Value) -> K::Value,
    ) -> Result<WireId<K>, Error> {
        let l = self.wires.value(left)?;
        let r = self.wires.value(right)?;
        if l.len() != r.len() {
            return Err(Error::Construction(format!(
                "{name} of {left:?} with {} lanes and {right:?} with {} lanes",
                l.len(),
                r.len()
            )));
        }
        let value: Vec<K::Value> = l.iter().zip(r).map(|(l, r)| op(*l, *r)).collect();
        let (ls, rs) = (self.wires.is_secret(left)?, self.wires.is_secret(right)?);
        let lanes = value.len();
        self.count(free(ls, rs), lanes);
        Ok(self.wires.allocate(Some(value), lanes, ls || rs, 0))
    }

    fn unary<K: StoredKind>(
        &mut self,
        wire: WireId<K>,
        op: impl Fn(K::Value) -> K::Value,
    ) -> Result<WireId<K>, Error> {
        let value: Vec<K::Value> = self.wires.value(wire)?.iter().map(|v| op(*v)).collect();
        let secret = self.wires.is_secret(wire)?;
        let lanes = value.len();
        self.count(true, lanes);
        Ok(self.wires.allocate(Some(value), lanes, secret, 0))
    }

    fn open<K: StoredKind>(&mut self, wire: WireId<K>, party: usize) -> Result<WireId<K>, Error> {
        self.check_party(party)?;
        let mut value = self.value_of(wire)?;
        let secret = self.wires.is_secret(wire)?;
        if secret && party != self.party_id {
            value.fill(K::Value::default());
        }
        let lanes = value.len();
        self.count(!secret, lanes);
        Ok(self.wires.allocate(Some(value), lanes, false, 0))
    }

    fn public_value<K: StoredKind>(&self, wire: WireId<K>) -> Result<Vec<K::Value>, Error> {
        if self.wires.is_secret(wire)? {
            return Err(Error::RuntimeType(format!(
                "{wire:?} is secret, open it before reading its value"
            )));
        }
        self.value_of(wire)
    }

    fn batching<K: StoredKind>(&mut self, wires: &[WireId<K>]) -> Result<WireId<K>, Error> {
        let mut value = Vec::new();
        let mut secret = false;
        for wire in wires {
            value.extend_from_slice(self.wires.value(*wire)?);
            secret |= self.wires.is_secret(*wire)?;
        }
        let lanes = value.len();
        self.count(true, lanes);
        Ok(self.wires.allocate(Some(value), lanes, secret, 0))
    }

    fn unbatching<K: StoredKind>(
        &mut self,
        wire: WireId<K>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<K>>, Error> {
        let value = self.value_of(wire)?;
        let total: usize = sizes.iter().sum();
        if total != value.len() {
            return Err(Error::Construction(format!(
                "can not split {wire:?} with {} lanes into {total} lanes",
                value.len()
            )));
        }
        let secret = self.wires.is_secret(wire)?;
        self.count(true, total);
        let mut rest = value.as_slice();
        let mut outputs = Vec::with_capacity(sizes.len());
        for size in sizes {
            let (part, tail) = rest.split_at(*size);
            outputs.push(self.wires.allocate(Some(part.to_vec()), *size, secret, 0));
            rest = tail;
        }
        Ok(outputs)
    }

    fn and_bits(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        self.binary("AND", left, right, |l, r| !(l && r), bool::bitand)
    }
}

impl Scheduler for PlaintextScheduler {
    fn party_id(&self) -> usize {
        self.party_id
    }

    fn num_parties(&self) -> usize {
        self.num_parties
    }

    async fn private_boolean_input(
        &mut self,
        owner: usize,
        values: &[bool],
    ) -> Result<WireId<Boolean>, Error> {
        self.check_party(owner)?;
        Ok(self.input(values.to_vec(), true))
    }

    fn public_boolean_input(&mut self, values: &[bool]) -> WireId<Boolean> {
        self.input(values.to_vec(), false)
    }

    async fn recover_boolean_wire(&mut self, shares: &[bool]) -> Result<WireId<Boolean>, Error> {
        Ok(self.input(shares.to_vec(), true))
    }

    async fn open_boolean_to_party(
        &mut self,
        wire: WireId<Boolean>,
        party: usize,
    ) -> Result<WireId<Boolean>, Error> {
        self.open(wire, party)
    }

    async fn extract_boolean_share(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        self.value_of(wire)
    }

    async fn boolean_value(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        self.public_value(wire)
    }

    async fn and(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        self.and_bits(left, right)
    }

    fn xor(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        self.binary("XOR", left, right, |_, _| true, bool::bitxor)
    }

    fn not(&mut self, wire: WireId<Boolean>) -> Result<WireId<Boolean>, Error> {
        self.unary(wire, |v| !v)
    }

    async fn composite_and(
        &mut self,
        left: WireId<Boolean>,
        rights: &[WireId<Boolean>],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        let lanes = self.wires.lanes(left)?;
        for right in rights {
            let right_lanes = self.wires.lanes(*right)?;
            if right_lanes != lanes {
                return Err(Error::Construction(format!(
                    "composite AND of {left:?} with {lanes} lanes and {right:?} with \
                     {right_lanes} lanes"
                )));
            }
        }
        rights
            .iter()
            .map(|right| self.and_bits(left, *right))
            .collect()
    }

    fn batching_boolean(&mut self, wires: &[WireId<Boolean>]) -> Result<WireId<Boolean>, Error> {
        self.batching(wires)
    }

    fn unbatching_boolean(
        &mut self,
        wire: WireId<Boolean>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        self.unbatching(wire, sizes)
    }

    async fn private_integer_input(
        &mut self,
        owner: usize,
        values: &[u64],
    ) -> Result<WireId<Arithmetic>, Error> {
        self.check_party(owner)?;
        Ok(self.input(values.to_vec(), true))
    }

    fn public_integer_input(&mut self, values: &[u64]) -> WireId<Arithmetic> {
        self.input(values.to_vec(), false)
    }

    async fn recover_integer_wire(&mut self, shares: &[u64]) -> Result<WireId<Arithmetic>, Error> {
        Ok(self.input(shares.to_vec(), true))
    }

    async fn open_integer_to_party(
        &mut self,
        wire: WireId<Arithmetic>,
        party: usize,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.open(wire, party)
    }

    async fn extract_integer_share(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        self.value_of(wire)
    }

    async fn integer_value(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        self.public_value(wire)
    }

    fn plus(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.binary("PLUS", left, right, |_, _| true, u64::wrapping_add)
    }

    fn neg(&mut self, wire: WireId<Arithmetic>) -> Result<WireId<Arithmetic>, Error> {
        self.unary(wire, u64::wrapping_neg)
    }

    async fn mult(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.binary("MULT", left, right, |l, r| !(l && r), u64::wrapping_mul)
    }

    fn batching_integer(
        &mut self,
        wires: &[WireId<Arithmetic>],
    ) -> Result<WireId<Arithmetic>, Error> {
        self.batching(wires)
    }

    fn unbatching_integer(
        &mut self,
        wire: WireId<Arithmetic>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Arithmetic>>, Error> {
        self.unbatching(wire, sizes)
    }

    fn release_boolean(&mut self, wire: WireId<Boolean>) -> Result<(), Error> {
        self.wires.decrease_reference(wire)
    }

    fn release_integer(&mut self, wire: WireId<Arithmetic>) -> Result<(), Error> {
        self.wires.decrease_reference(wire)
    }

    fn boolean_lanes(&self, wire: WireId<Boolean>) -> Result<usize, Error> {
        self.wires.lanes(wire)
    }

    fn integer_lanes(&self, wire: WireId<Arithmetic>) -> Result<usize, Error> {
        self.wires.lanes(wire)
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn traffic_statistics(&self) -> TrafficStats {
        TrafficStats::default()
    }

    fn gate_statistics(&self) -> GateStats {
        self.statistics
    }

    fn wire_statistics(&self) -> WireStats {
        self.wires.wire_statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn computes_in_the_clear() {
        let mut scheduler = PlaintextScheduler::new(1, 2).unwrap();
        let x = scheduler
            .private_boolean_input(0, &[true, false, true])
            .await
            .unwrap();
        let y = scheduler.public_boolean_input(&[true, true, false]);
        let and = scheduler.and(x, y).await.unwrap();
        let not = scheduler.not(and).unwrap();
        let opened = scheduler.open_boolean_to_party(not, 1).await.unwrap();
        assert_eq!(
            scheduler.boolean_value(opened).await.unwrap(),
            vec![false, true, true]
        );
        let hidden = scheduler.open_boolean_to_party(not, 0).await.unwrap();
        assert_eq!(scheduler.boolean_value(hidden).await.unwrap(), vec![false; 3]);
        assert!(matches!(
            scheduler.boolean_value(not).await,
            Err(Error::RuntimeType(_))
        ));

        let u = scheduler.private_integer_input(1, &[u64::MAX, 3]).await.unwrap();
        let v = scheduler.private_integer_input(0, &[2, 5]).await.unwrap();
        let product = scheduler.mult(u, v).await.unwrap();
        let sum = scheduler.plus(product, u).unwrap();
        let parts = scheduler.unbatching_integer(sum, &[1, 1]).unwrap();
        let swapped = scheduler.batching_integer(&[parts[1], parts[0]]).unwrap();
        assert_eq!(
            scheduler.extract_integer_share(swapped).await.unwrap(),
            vec![18, u64::MAX.wrapping_mul(3)]
        );
        assert_eq!(
            scheduler.gate_statistics(),
            GateStats {
                non_free: 3 + 3 + 2,
                free: 3 + 3 + 3 + 3 + 2 + 2 + 2 + 2 + 2
            }
        );
    }

    #[test]
    fn rejects_unknown_parties() {
        assert!(matches!(
            PlaintextScheduler::new(2, 2),
            Err(Error::Construction(_))
        ));
    }
}
