use std::collections::BTreeMap;

use crate::{
    Error,
    scheduler::{Arithmetic, Boolean, WireId, WireKind, WireStats},
};

#[derive(Debug)]
struct WireRecord<T> {
    value: Option<Vec<T>>,
    lanes: usize,
    secret: bool,
    level: usize,
    references: usize,
}

/// The wires of one kind, indexed by [`WireId`].
///
/// The arena only grows: ids are never reused and the slot of a released
/// wire stays `None`, so a stale id keeps failing with
/// [`Error::InvalidAccess`]. Only the slot header outlives a wire, its values
/// are dropped on release.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    wires: Vec<Option<WireRecord<T>>>,
    deallocated: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            wires: Vec::new(),
            deallocated: 0,
        }
    }
}

/// Public values and shares waiting to be revealed, grouped by receiver.
#[derive(Debug, Default)]
pub(crate) struct Reveals {
    pub(crate) booleans: BTreeMap<usize, Vec<bool>>,
    pub(crate) integers: BTreeMap<usize, Vec<u64>>,
}

/// Selects the arena and the reveal queue of a wire kind.
pub(crate) trait StoredKind: WireKind {
    fn arena(keeper: &WireKeeper) -> &Arena<Self::Value>;

    fn arena_mut(keeper: &mut WireKeeper) -> &mut Arena<Self::Value>;

    fn reveals(reveals: &mut Reveals) -> &mut BTreeMap<usize, Vec<Self::Value>>;
}

impl StoredKind for Boolean {
    fn arena(keeper: &WireKeeper) -> &Arena<bool> {
        &keeper.booleans
    }

    fn arena_mut(keeper: &mut WireKeeper) -> &mut Arena<bool> {
        &mut keeper.booleans
    }

    fn reveals(reveals: &mut Reveals) -> &mut BTreeMap<usize, Vec<bool>> {
        &mut reveals.booleans
    }
}

impl StoredKind for Arithmetic {
    fn arena(keeper: &WireKeeper) -> &Arena<u64> {
        &keeper.integers
    }

    fn arena_mut(keeper: &mut WireKeeper) -> &mut Arena<u64> {
        &mut keeper.integers
    }

    fn reveals(reveals: &mut Reveals) -> &mut BTreeMap<usize, Vec<u64>> {
        &mut reveals.integers
    }
}

/// Owns the values of all wires and counts their references.
///
/// A wire is created with one reference, held by the caller. Gates that read
/// or write a wire hold another reference until they are evaluated. The
/// value is dropped once the last reference is gone.
#[derive(Debug, Default)]
pub(crate) struct WireKeeper {
    booleans: Arena<bool>,
    integers: Arena<u64>,
}

impl WireKeeper {
    /// Allocates a wire of `lanes` lanes. `value` is `None` for wires that
    /// are computed later.
    pub(crate) fn allocate<K: StoredKind>(
        &mut self,
        value: Option<Vec<K::Value>>,
        lanes: usize,
        secret: bool,
        level: usize,
    ) -> WireId<K> {
        debug_assert!(value.as_ref().is_none_or(|v| v.len() == lanes));
        let arena = K::arena_mut(self);
        arena.wires.push(Some(WireRecord {
            value,
            lanes,
            secret,
            level,
            references: 1,
        }));
        WireId::new(arena.wires.len() - 1)
    }

    fn record<K: StoredKind>(&self, id: WireId<K>) -> Result<&WireRecord<K::Value>, Error> {
        K::arena(self)
            .wires
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::InvalidAccess(format!("{id:?} is released or unknown")))
    }

    fn record_mut<K: StoredKind>(
        &mut self,
        id: WireId<K>,
    ) -> Result<&mut WireRecord<K::Value>, Error> {
        K::arena_mut(self)
            .wires
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::InvalidAccess(format!("{id:?} is released or unknown")))
    }

    /// The lanes of a computed wire.
    pub(crate) fn value<K: StoredKind>(&self, id: WireId<K>) -> Result<&[K::Value], Error> {
        self.record(id)?
            .value
            .as_deref()
            .ok_or_else(|| Error::InvalidAccess(format!("{id:?} is not evaluated yet")))
    }

    pub(crate) fn set_value<K: StoredKind>(
        &mut self,
        id: WireId<K>,
        value: Vec<K::Value>,
    ) -> Result<(), Error> {
        let record = self.record_mut(id)?;
        if record.lanes != value.len() {
            return Err(Error::Construction(format!(
                "{id:?} has {} lanes, got a value of {} lanes",
                record.lanes,
                value.len()
            )));
        }
        record.value = Some(value);
        Ok(())
    }

    pub(crate) fn is_resolved<K: StoredKind>(&self, id: WireId<K>) -> Result<bool, Error> {
        Ok(self.record(id)?.value.is_some())
    }

    pub(crate) fn lanes<K: StoredKind>(&self, id: WireId<K>) -> Result<usize, Error> {
        Ok(self.record(id)?.lanes)
    }

    pub(crate) fn is_secret<K: StoredKind>(&self, id: WireId<K>) -> Result<bool, Error> {
        Ok(self.record(id)?.secret)
    }

    /// The first level at which the wire is available.
    pub(crate) fn level<K: StoredKind>(&self, id: WireId<K>) -> Result<usize, Error> {
        Ok(self.record(id)?.level)
    }

    pub(crate) fn increase_reference<K: StoredKind>(&mut self, id: WireId<K>) -> Result<(), Error> {
        self.record_mut(id)?.references += 1;
        Ok(())
    }

    /// Drops the value of the wire with its last reference. The slot is not
    /// handed out again.
    pub(crate) fn decrease_reference<K: StoredKind>(&mut self, id: WireId<K>) -> Result<(), Error> {
        let record = self.record_mut(id)?;
        record.references -= 1;
        if record.references == 0 {
            let arena = K::arena_mut(self);
            arena.wires[id.index()] = None;
            arena.deallocated += 1;
        }
        Ok(())
    }

    pub(crate) fn wire_statistics(&self) -> WireStats {
        WireStats {
            allocated: (self.booleans.wires.len() + self.integers.wires.len()) as u64,
            deallocated: (self.booleans.deallocated + self.integers.deallocated) as u64,
        }
    }
}
