//! Schedulers turn gate calls into engine operations.
//!
//! A [`Scheduler`] owns all wires of one party. Wires are referred to by
//! typed [`WireId`]s and hold a batch of lanes, either secret shares or a
//! public value. The secret flag and the lane count of a wire never change.
//!
//! Operations that never need the network ([`Scheduler::xor`],
//! [`Scheduler::plus`], inputs, batching, ...) are synchronous. Everything
//! else is `async`: [`EagerScheduler`] evaluates such operations right away,
//! while [`LazyScheduler`] only records them and evaluates all pending gates
//! level by level once a value is needed, so that independent AND and MULT
//! gates share a round of communication.
//!
//! [`PlaintextScheduler`] and [`NetworkPlaintextScheduler`] compute on
//! plaintext values and give the same results as the secure schedulers. They
//! are meant for testing circuits.
use std::{fmt, hash::Hash, marker::PhantomData};

use serde::{Deserialize, Serialize};

use crate::{Error, agent::TrafficStats};

mod gate;
mod gate_keeper;
mod network_plaintext;
mod plaintext;
mod secret_share;
mod wire_keeper;

pub use network_plaintext::NetworkPlaintextScheduler;
pub use plaintext::PlaintextScheduler;
pub use secret_share::{
    DefaultEagerScheduler, DefaultLazyScheduler, EagerScheduler, LazyScheduler,
    SecretShareScheduler,
};

mod sealed {
    pub trait Sealed {}
}

/// The kind of value a wire holds.
pub trait WireKind: sealed::Sealed + Copy + fmt::Debug + Send + Sync + 'static {
    /// The value of one lane.
    type Value: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Used in error messages.
    const NAME: &'static str;
}

/// Wires of XOR-shared bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boolean;

/// Wires of integers, additively shared modulo `2^64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arithmetic;

impl sealed::Sealed for Boolean {}
impl sealed::Sealed for Arithmetic {}

impl WireKind for Boolean {
    type Value = bool;
    const NAME: &'static str = "boolean";
}

impl WireKind for Arithmetic {
    type Value = u64;
    const NAME: &'static str = "integer";
}

/// A handle to a wire of a [`Scheduler`].
///
/// Handles are never reused within one scheduler.
pub struct WireId<K> {
    index: usize,
    kind: PhantomData<K>,
}

impl<K> WireId<K> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            kind: PhantomData,
        }
    }

    /// The position of the wire in its arena.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<K> Clone for WireId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for WireId<K> {}

impl<K> PartialEq for WireId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<K> Eq for WireId<K> {}

impl<K> Hash for WireId<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<K: WireKind> fmt::Debug for WireId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", K::NAME, self.index)
    }
}

/// Number of evaluated gate results, counted per lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    /// Results of gates that needed communication.
    pub non_free: u64,
    /// Results computed locally.
    pub free: u64,
}

/// Number of wires created and released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireStats {
    /// Wires allocated so far.
    pub allocated: u64,
    /// Wires whose last reference was dropped.
    pub deallocated: u64,
}

/// The gate-level interface used by the frontend types and by games.
///
/// All parties must call the same operations in the same order with the same
/// lane counts. Binary operations on wires with different lane counts fail
/// with [`Error::Construction`].
///
/// Private inputs are given by every party. Only the owner's values are used,
/// the other parties pass placeholders of the same length.
#[allow(async_fn_in_trait)]
pub trait Scheduler {
    /// The id of the local party.
    fn party_id(&self) -> usize;

    /// The number of parties of the computation.
    fn num_parties(&self) -> usize;

    /// A secret wire holding the input of `owner`.
    async fn private_boolean_input(
        &mut self,
        owner: usize,
        values: &[bool],
    ) -> Result<WireId<Boolean>, Error>;

    /// A public wire holding `values`, which all parties must agree on.
    fn public_boolean_input(&mut self, values: &[bool]) -> WireId<Boolean>;

    /// A secret wire made from this party's shares, as returned by
    /// [`Scheduler::extract_boolean_share`].
    async fn recover_boolean_wire(&mut self, shares: &[bool]) -> Result<WireId<Boolean>, Error>;

    /// A public wire that holds the value of `wire` at `party` and zeros at
    /// every other party.
    async fn open_boolean_to_party(
        &mut self,
        wire: WireId<Boolean>,
        party: usize,
    ) -> Result<WireId<Boolean>, Error>;

    /// This party's shares of `wire`. For a public wire, party 0 gets the
    /// value and all other parties get zeros.
    async fn extract_boolean_share(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error>;

    /// The value of a public wire.
    async fn boolean_value(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error>;

    /// Lane-wise AND.
    async fn and(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error>;

    /// Lane-wise XOR.
    fn xor(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error>;

    /// Lane-wise negation.
    fn not(&mut self, wire: WireId<Boolean>) -> Result<WireId<Boolean>, Error>;

    /// `left & rights[i]` for every `i`, sharing the opening of `left`.
    async fn composite_and(
        &mut self,
        left: WireId<Boolean>,
        rights: &[WireId<Boolean>],
    ) -> Result<Vec<WireId<Boolean>>, Error>;

    /// Concatenates the lanes of `wires`.
    fn batching_boolean(&mut self, wires: &[WireId<Boolean>]) -> Result<WireId<Boolean>, Error>;

    /// Splits the lanes of `wire` into wires of `sizes` lanes.
    fn unbatching_boolean(
        &mut self,
        wire: WireId<Boolean>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Boolean>>, Error>;

    /// A secret wire holding the input of `owner`.
    async fn private_integer_input(
        &mut self,
        owner: usize,
        values: &[u64],
    ) -> Result<WireId<Arithmetic>, Error>;

    /// A public wire holding `values`.
    fn public_integer_input(&mut self, values: &[u64]) -> WireId<Arithmetic>;

    /// A secret wire made from this party's shares.
    async fn recover_integer_wire(&mut self, shares: &[u64]) -> Result<WireId<Arithmetic>, Error>;

    /// A public wire that holds the value of `wire` at `party` and zeros at
    /// every other party.
    async fn open_integer_to_party(
        &mut self,
        wire: WireId<Arithmetic>,
        party: usize,
    ) -> Result<WireId<Arithmetic>, Error>;

    /// This party's shares of `wire`.
    async fn extract_integer_share(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error>;

    /// The value of a public wire.
    async fn integer_value(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error>;

    /// Lane-wise sum modulo `2^64`.
    fn plus(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error>;

    /// Lane-wise negation modulo `2^64`.
    fn neg(&mut self, wire: WireId<Arithmetic>) -> Result<WireId<Arithmetic>, Error>;

    /// Lane-wise product modulo `2^64`.
    async fn mult(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error>;

    /// Concatenates the lanes of `wires`.
    fn batching_integer(
        &mut self,
        wires: &[WireId<Arithmetic>],
    ) -> Result<WireId<Arithmetic>, Error>;

    /// Splits the lanes of `wire` into wires of `sizes` lanes.
    fn unbatching_integer(
        &mut self,
        wire: WireId<Arithmetic>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Arithmetic>>, Error>;

    /// Drops the caller's reference to `wire`. The wire must not be used
    /// afterwards.
    fn release_boolean(&mut self, wire: WireId<Boolean>) -> Result<(), Error>;

    /// Drops the caller's reference to `wire`.
    fn release_integer(&mut self, wire: WireId<Arithmetic>) -> Result<(), Error>;

    /// The number of lanes of `wire`.
    fn boolean_lanes(&self, wire: WireId<Boolean>) -> Result<usize, Error>;

    /// The number of lanes of `wire`.
    fn integer_lanes(&self, wire: WireId<Arithmetic>) -> Result<usize, Error>;

    /// Evaluates all pending gates.
    async fn flush(&mut self) -> Result<(), Error>;

    /// Traffic caused so far, including tuple generation.
    fn traffic_statistics(&self) -> TrafficStats;

    /// Gate results evaluated so far.
    fn gate_statistics(&self) -> GateStats;

    /// Wires allocated and released so far.
    fn wire_statistics(&self) -> WireStats;
}
