use std::collections::VecDeque;

use tracing::{Level, debug, instrument};

use crate::{
    Error,
    channel::Channel,
    engine::SecretShareEngine,
    scheduler::{
        Arithmetic, Boolean, GateStats, WireId,
        gate::{Gate, GateKind, Output, Rebatching},
        wire_keeper::{Reveals, WireKeeper},
    },
    tuple_generator::{ArithmeticTupleGenerator, BooleanTupleGenerator},
};

/// Free gates are evaluated on even levels, gates that need communication on
/// odd levels.
pub(crate) fn is_level_free(level: usize) -> bool {
    level % 2 == 0
}

/// Records gates by level and evaluates them level by level.
///
/// A gate is placed on the first level of the right parity that comes after
/// the levels of its inputs. Gates of the same level never depend on each
/// other, except for free gates, which are evaluated in creation order.
pub(crate) struct GateKeeper {
    wires: WireKeeper,
    levels: VecDeque<Vec<Gate>>,
    first_unexecuted_level: usize,
    unexecuted_gates: usize,
    max_unexecuted_gates: usize,
    statistics: GateStats,
}

impl GateKeeper {
    pub(crate) fn new(max_unexecuted_gates: usize) -> Self {
        Self {
            wires: WireKeeper::default(),
            levels: VecDeque::new(),
            first_unexecuted_level: 0,
            unexecuted_gates: 0,
            max_unexecuted_gates,
            statistics: GateStats::default(),
        }
    }

    pub(crate) fn wires(&self) -> &WireKeeper {
        &self.wires
    }

    pub(crate) fn wires_mut(&mut self) -> &mut WireKeeper {
        &mut self.wires
    }

    pub(crate) fn gate_statistics(&self) -> GateStats {
        self.statistics
    }

    #[cfg(test)]
    fn first_unexecuted_level(&self) -> usize {
        self.first_unexecuted_level
    }

    pub(crate) fn number_of_unexecuted_gates(&self) -> usize {
        self.unexecuted_gates
    }

    pub(crate) fn has_reached_batching_limit(&self) -> bool {
        self.unexecuted_gates > self.max_unexecuted_gates
    }

    /// The level of a new gate whose inputs are available at
    /// `max_input_level`.
    pub(crate) fn output_level(&self, is_free: bool, max_input_level: usize) -> usize {
        let earliest = if is_free {
            max_input_level
        } else {
            max_input_level + 1
        };
        let level = earliest.max(self.first_unexecuted_level);
        if is_level_free(level) == is_free {
            level
        } else {
            level + 1
        }
    }

    pub(crate) fn pop_first_unexecuted_level(&mut self) -> Option<Vec<Gate>> {
        let gates = self.levels.pop_front()?;
        self.first_unexecuted_level += 1;
        self.unexecuted_gates -= gates.len();
        Some(gates)
    }

    fn add_gate(&mut self, gate: Gate, level: usize, results: usize) -> Result<(), Error> {
        gate.hold(&mut self.wires)?;
        self.push_gate(gate, level, results);
        Ok(())
    }

    /// Records a gate whose input wires are already held.
    fn push_gate(&mut self, gate: Gate, level: usize, results: usize) {
        if gate.is_free() {
            self.statistics.free += results as u64;
        } else {
            self.statistics.non_free += results as u64;
        }
        let offset = level - self.first_unexecuted_level;
        if self.levels.len() <= offset {
            self.levels.resize_with(offset + 1, Vec::new);
        }
        self.levels[offset].push(gate);
        self.unexecuted_gates += 1;
    }

    fn max_level<K: GateKind>(&self, wires: &[WireId<K>]) -> Result<usize, Error> {
        wires
            .iter()
            .try_fold(0, |level, w| Ok(level.max(self.wires.level(*w)?)))
    }

    /// Lane count, secret flag and level of the inputs of a binary gate.
    fn binary<K: GateKind>(
        &self,
        op: &str,
        left: WireId<K>,
        right: WireId<K>,
    ) -> Result<(usize, bool, bool, usize), Error> {
        let lanes = self.wires.lanes(left)?;
        let right_lanes = self.wires.lanes(right)?;
        if lanes != right_lanes {
            return Err(Error::Construction(format!(
                "{op} of {left:?} with {lanes} lanes and {right:?} with {right_lanes} lanes"
            )));
        }
        let level = self.max_level(&[left, right])?;
        Ok((
            lanes,
            self.wires.is_secret(left)?,
            self.wires.is_secret(right)?,
            level,
        ))
    }

    /// A wire that already holds `value`.
    pub(crate) fn input<K: GateKind>(&mut self, value: Vec<K::Value>, secret: bool) -> WireId<K> {
        let level = self.output_level(true, self.first_unexecuted_level);
        let lanes = value.len();
        let output = self.wires.allocate(Some(value), lanes, secret, level);
        // an input gate reads no wires
        self.push_gate(Gate::Input, level, lanes);
        output
    }

    pub(crate) fn xor(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        let (lanes, l, r, max_level) = self.binary("XOR", left, right)?;
        let level = self.output_level(true, max_level);
        let output = self.wires.allocate(None, lanes, l || r, level);
        let gate = Gate::Xor {
            left,
            right,
            output,
        };
        self.add_gate(gate, level, lanes)?;
        Ok(output)
    }

    pub(crate) fn not(&mut self, input: WireId<Boolean>) -> Result<WireId<Boolean>, Error> {
        let lanes = self.wires.lanes(input)?;
        let level = self.output_level(true, self.wires.level(input)?);
        let secret = self.wires.is_secret(input)?;
        let output = self.wires.allocate(None, lanes, secret, level);
        self.add_gate(Gate::Not { input, output }, level, lanes)?;
        Ok(output)
    }

    pub(crate) fn and(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        let (lanes, l, r, max_level) = self.binary("AND", left, right)?;
        let free = !(l && r);
        let level = self.output_level(free, max_level);
        let output = self.wires.allocate(None, lanes, l || r, level);
        let gate = Gate::And {
            left,
            right,
            output,
            free,
            index: None,
        };
        self.add_gate(gate, level, lanes)?;
        Ok(output)
    }

    /// ANDs `left` with every right wire. The secret right wires of a secret
    /// `left` share one composite gate, all others get a free AND gate.
    pub(crate) fn composite_and(
        &mut self,
        left: WireId<Boolean>,
        rights: &[WireId<Boolean>],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        let lanes = self.wires.lanes(left)?;
        let mut secret_rights = Vec::new();
        for right in rights {
            let right_lanes = self.wires.lanes(*right)?;
            if right_lanes != lanes {
                return Err(Error::Construction(format!(
                    "composite AND of {left:?} with {lanes} lanes and {right:?} with \
                     {right_lanes} lanes"
                )));
            }
            if self.wires.is_secret(*right)? {
                secret_rights.push(*right);
            }
        }
        if !self.wires.is_secret(left)? || secret_rights.is_empty() {
            return rights.iter().map(|right| self.and(left, *right)).collect();
        }

        let max_level = self
            .wires
            .level(left)?
            .max(self.max_level(&secret_rights)?);
        let level = self.output_level(false, max_level);
        let outputs: Vec<WireId<Boolean>> = secret_rights
            .iter()
            .map(|_| self.wires.allocate(None, lanes, true, level))
            .collect();
        let results = lanes * outputs.len();
        let gate = Gate::CompositeAnd {
            left,
            rights: secret_rights,
            outputs: outputs.clone(),
            index: None,
        };
        self.add_gate(gate, level, results)?;

        let mut composite = outputs.into_iter();
        let mut wires = Vec::with_capacity(rights.len());
        for right in rights {
            let wire = if self.wires.is_secret(*right)? {
                composite.next().ok_or_else(|| {
                    Error::Construction("composite AND outputs out of sync".into())
                })?
            } else {
                self.and(left, *right)?
            };
            wires.push(wire);
        }
        Ok(wires)
    }

    pub(crate) fn plus(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        let (lanes, l, r, max_level) = self.binary("PLUS", left, right)?;
        let level = self.output_level(true, max_level);
        let output = self.wires.allocate(None, lanes, l || r, level);
        let gate = Gate::Plus {
            left,
            right,
            output,
        };
        self.add_gate(gate, level, lanes)?;
        Ok(output)
    }

    pub(crate) fn neg(&mut self, input: WireId<Arithmetic>) -> Result<WireId<Arithmetic>, Error> {
        let lanes = self.wires.lanes(input)?;
        let level = self.output_level(true, self.wires.level(input)?);
        let secret = self.wires.is_secret(input)?;
        let output = self.wires.allocate(None, lanes, secret, level);
        self.add_gate(Gate::Neg { input, output }, level, lanes)?;
        Ok(output)
    }

    pub(crate) fn mult(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        let (lanes, l, r, max_level) = self.binary("MULT", left, right)?;
        let free = !(l && r);
        let level = self.output_level(free, max_level);
        let output = self.wires.allocate(None, lanes, l || r, level);
        let gate = Gate::Mult {
            left,
            right,
            output,
            free,
            index: None,
        };
        self.add_gate(gate, level, lanes)?;
        Ok(output)
    }

    /// A public wire that receives the value of `input` at `party`.
    pub(crate) fn output<K: GateKind>(
        &mut self,
        input: WireId<K>,
        party: usize,
    ) -> Result<WireId<K>, Error> {
        let lanes = self.wires.lanes(input)?;
        let secret = self.wires.is_secret(input)?;
        let level = self.output_level(!secret, self.wires.level(input)?);
        let output = self.wires.allocate(None, lanes, false, level);
        let gate = K::output_gate(Output {
            input,
            output,
            party,
            secret,
            offset: 0,
        });
        self.add_gate(gate, level, lanes)?;
        Ok(output)
    }

    fn rebatching<K: GateKind>(
        &mut self,
        inputs: Vec<WireId<K>>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<K>>, Error> {
        let mut secret = false;
        for input in &inputs {
            secret |= self.wires.is_secret(*input)?;
        }
        let level = self.output_level(true, self.max_level(&inputs)?);
        let outputs: Vec<WireId<K>> = sizes
            .iter()
            .map(|lanes| self.wires.allocate(None, *lanes, secret, level))
            .collect();
        let gate = K::rebatching_gate(Rebatching {
            inputs,
            outputs: outputs.clone(),
            secret,
        });
        self.add_gate(gate, level, sizes.iter().sum())?;
        Ok(outputs)
    }

    /// Concatenates the lanes of `inputs` into one wire.
    pub(crate) fn batching<K: GateKind>(
        &mut self,
        inputs: &[WireId<K>],
    ) -> Result<WireId<K>, Error> {
        let mut lanes = 0;
        for input in inputs {
            lanes += self.wires.lanes(*input)?;
        }
        let mut outputs = self.rebatching(inputs.to_vec(), &[lanes])?;
        outputs
            .pop()
            .ok_or_else(|| Error::Construction("batching produced no wire".into()))
    }

    /// Splits `input` into wires of `sizes` lanes.
    pub(crate) fn unbatching<K: GateKind>(
        &mut self,
        input: WireId<K>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<K>>, Error> {
        let lanes = self.wires.lanes(input)?;
        let total: usize = sizes.iter().sum();
        if total != lanes {
            return Err(Error::Construction(format!(
                "can not split {input:?} with {lanes} lanes into {total} lanes"
            )));
        }
        self.rebatching(vec![input], sizes)
    }

    fn compute_level<C, B, A>(
        &mut self,
        engine: &mut SecretShareEngine<C, B, A>,
        gates: &mut [Gate],
        reveals: &mut Reveals,
    ) -> Result<(), Error>
    where
        C: Channel,
        B: BooleanTupleGenerator,
        A: ArithmeticTupleGenerator,
    {
        for gate in gates {
            gate.compute(engine, &mut self.wires, reveals)?;
        }
        Ok(())
    }

    fn release_level(&mut self, gates: Vec<Gate>) -> Result<(), Error> {
        gates
            .into_iter()
            .try_for_each(|gate| gate.release(&mut self.wires))
    }

    /// Evaluates the first unexecuted level. Returns `false` if there is none.
    ///
    /// On levels with non-free gates, the engine executes all scheduled
    /// operations at once and the reveals follow in ascending party order.
    #[instrument(level = Level::DEBUG, skip_all, fields(level = self.first_unexecuted_level), err)]
    pub(crate) async fn execute_one_level<C, B, A>(
        &mut self,
        engine: &mut SecretShareEngine<C, B, A>,
    ) -> Result<bool, Error>
    where
        C: Channel,
        B: BooleanTupleGenerator,
        A: ArithmeticTupleGenerator,
    {
        let level = self.first_unexecuted_level;
        let Some(mut gates) = self.pop_first_unexecuted_level() else {
            return Ok(false);
        };
        let mut reveals = Reveals::default();
        self.compute_level(engine, &mut gates, &mut reveals)?;
        if !is_level_free(level) && !gates.is_empty() {
            engine.execute_scheduled_operations().await?;
            let mut revealed = Reveals::default();
            for (party, shares) in reveals.booleans {
                let value = engine.reveal_to_party(party, &shares).await?;
                revealed.booleans.insert(party, value);
            }
            for (party, shares) in reveals.integers {
                let value = engine.reveal_integers_to_party(party, &shares).await?;
                revealed.integers.insert(party, value);
            }
            for gate in &mut gates {
                gate.collect_result(engine, &mut self.wires, &mut revealed)?;
            }
        }
        debug!(gates = gates.len(), "level executed");
        self.release_level(gates)?;
        Ok(true)
    }

    /// Evaluates levels from the front for as long as they need no
    /// communication.
    pub(crate) fn execute_free_levels<C, B, A>(
        &mut self,
        engine: &mut SecretShareEngine<C, B, A>,
    ) -> Result<(), Error>
    where
        C: Channel,
        B: BooleanTupleGenerator,
        A: ArithmeticTupleGenerator,
    {
        while let Some(front) = self.levels.front() {
            if !is_level_free(self.first_unexecuted_level) && !front.is_empty() {
                break;
            }
            let Some(mut gates) = self.pop_first_unexecuted_level() else {
                break;
            };
            self.compute_level(engine, &mut gates, &mut Reveals::default())?;
            self.release_level(gates)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_and_non_free_gates_alternate_levels() {
        let mut keeper = GateKeeper::new(10);
        let a = keeper.input::<Boolean>(vec![true, false], true);
        let b = keeper.input::<Boolean>(vec![true, true], true);
        let p = keeper.input::<Boolean>(vec![false, true], false);
        assert_eq!(keeper.wires().level(a).unwrap(), 0);

        let x = keeper.xor(a, b).unwrap();
        assert_eq!(keeper.wires().level(x).unwrap(), 0);
        let free = keeper.and(x, p).unwrap();
        assert_eq!(keeper.wires().level(free).unwrap(), 0);
        let and = keeper.and(x, b).unwrap();
        assert_eq!(keeper.wires().level(and).unwrap(), 1);
        let not = keeper.not(and).unwrap();
        assert_eq!(keeper.wires().level(not).unwrap(), 2);
        let second = keeper.and(not, a).unwrap();
        assert_eq!(keeper.wires().level(second).unwrap(), 3);
        let independent = keeper.and(a, b).unwrap();
        assert_eq!(keeper.wires().level(independent).unwrap(), 1);
        let opened = keeper.output(a, 0).unwrap();
        assert_eq!(keeper.wires().level(opened).unwrap(), 1);
        let copied = keeper.output(p, 1).unwrap();
        assert_eq!(keeper.wires().level(copied).unwrap(), 0);

        assert_eq!(keeper.number_of_unexecuted_gates(), 11);
        assert!(keeper.has_reached_batching_limit());
        assert_eq!(
            keeper.gate_statistics(),
            GateStats {
                non_free: 8,
                free: 14
            }
        );

        let level = keeper.pop_first_unexecuted_level().unwrap();
        assert_eq!(level.len(), 6);
        assert_eq!(keeper.first_unexecuted_level(), 1);
        let late = keeper.xor(a, b).unwrap();
        assert_eq!(keeper.wires().level(late).unwrap(), 2);
    }

    #[test]
    fn inputs_are_recorded_as_free_gates() {
        let mut keeper = GateKeeper::new(10);
        let secret = keeper.input::<Boolean>(vec![true; 3], true);
        let public = keeper.input::<Arithmetic>(vec![7, 8], false);
        assert_eq!(keeper.number_of_unexecuted_gates(), 2);
        assert_eq!(
            keeper.gate_statistics(),
            GateStats {
                non_free: 0,
                free: 5
            }
        );
        assert!(keeper.wires().is_resolved(secret).unwrap());
        assert!(keeper.wires().is_resolved(public).unwrap());
        let level = keeper.pop_first_unexecuted_level().unwrap();
        assert!(level.iter().all(|gate| matches!(gate, Gate::Input)));
    }

    #[test]
    fn lane_mismatches_are_rejected() {
        let mut keeper = GateKeeper::new(10);
        let a = keeper.input::<Boolean>(vec![true, false], true);
        let b = keeper.input::<Boolean>(vec![true], true);
        assert!(matches!(keeper.xor(a, b), Err(Error::Construction(_))));
        assert!(matches!(
            keeper.composite_and(a, &[a, b]),
            Err(Error::Construction(_))
        ));
        assert!(matches!(
            keeper.unbatching(a, &[1, 2]),
            Err(Error::Construction(_))
        ));
        let batch = keeper.batching(&[a, b]).unwrap();
        assert_eq!(keeper.wires().lanes(batch).unwrap(), 3);
        let parts = keeper.unbatching(batch, &[2, 0, 1]).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(keeper.wires().lanes(parts[1]).unwrap(), 0);
    }
}
