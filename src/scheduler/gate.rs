use crate::{
    Error,
    channel::Channel,
    engine::SecretShareEngine,
    scheduler::{
        Arithmetic, Boolean, WireId,
        wire_keeper::{Reveals, StoredKind, WireKeeper},
    },
    tuple_generator::{ArithmeticTupleGenerator, BooleanTupleGenerator},
};

/// Reveals a wire to one party, or copies it if it is public.
pub(crate) struct Output<K> {
    pub(crate) input: WireId<K>,
    pub(crate) output: WireId<K>,
    pub(crate) party: usize,
    pub(crate) secret: bool,
    pub(crate) offset: usize,
}

impl<K: StoredKind> Output<K> {
    fn compute(&mut self, wires: &mut WireKeeper, reveals: &mut Reveals) -> Result<(), Error> {
        let value = wires.value(self.input)?;
        if !self.secret {
            let value = value.to_vec();
            return wires.set_value(self.output, value);
        }
        let queue = K::reveals(reveals).entry(self.party).or_default();
        self.offset = queue.len();
        queue.extend_from_slice(value);
        Ok(())
    }

    fn collect_result(&self, wires: &mut WireKeeper, revealed: &mut Reveals) -> Result<(), Error> {
        let lanes = wires.lanes(self.output)?;
        let value = K::reveals(revealed)
            .get(&self.party)
            .and_then(|v| v.get(self.offset..self.offset + lanes))
            .ok_or_else(|| {
                Error::InvalidAccess(format!("no revealed value for {:?}", self.input))
            })?
            .to_vec();
        wires.set_value(self.output, value)
    }
}

/// Concatenates the lanes of the inputs and splits them among the outputs.
///
/// If the outputs are secret, public inputs become shares held by party 0.
pub(crate) struct Rebatching<K> {
    pub(crate) inputs: Vec<WireId<K>>,
    pub(crate) outputs: Vec<WireId<K>>,
    pub(crate) secret: bool,
}

impl<K: StoredKind> Rebatching<K> {
    fn compute(&self, wires: &mut WireKeeper, party_id: usize) -> Result<(), Error> {
        let mut lanes = Vec::new();
        for input in &self.inputs {
            let value = wires.value(*input)?;
            if self.secret && party_id != 0 && !wires.is_secret(*input)? {
                lanes.extend(std::iter::repeat_n(K::Value::default(), value.len()));
            } else {
                lanes.extend_from_slice(value);
            }
        }
        let mut rest = lanes.as_slice();
        for output in &self.outputs {
            let (head, tail) = rest
                .split_at_checked(wires.lanes(*output)?)
                .ok_or_else(|| Error::Construction("rebatching lanes do not add up".into()))?;
            wires.set_value(*output, head.to_vec())?;
            rest = tail;
        }
        Ok(())
    }
}

/// A recorded operation. Gates are free if they can be evaluated locally.
pub(crate) enum Gate {
    /// The wire is set when it is allocated, the gate only marks its level.
    Input,
    Xor {
        left: WireId<Boolean>,
        right: WireId<Boolean>,
        output: WireId<Boolean>,
    },
    Not {
        input: WireId<Boolean>,
        output: WireId<Boolean>,
    },
    And {
        left: WireId<Boolean>,
        right: WireId<Boolean>,
        output: WireId<Boolean>,
        free: bool,
        index: Option<usize>,
    },
    CompositeAnd {
        left: WireId<Boolean>,
        rights: Vec<WireId<Boolean>>,
        outputs: Vec<WireId<Boolean>>,
        index: Option<usize>,
    },
    Plus {
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
        output: WireId<Arithmetic>,
    },
    Neg {
        input: WireId<Arithmetic>,
        output: WireId<Arithmetic>,
    },
    Mult {
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
        output: WireId<Arithmetic>,
        free: bool,
        index: Option<usize>,
    },
    BooleanOutput(Output<Boolean>),
    IntegerOutput(Output<Arithmetic>),
    BooleanRebatching(Rebatching<Boolean>),
    IntegerRebatching(Rebatching<Arithmetic>),
}

/// Wraps the kind-generic gates into a [`Gate`].
pub(crate) trait GateKind: StoredKind {
    fn output_gate(output: Output<Self>) -> Gate;

    fn rebatching_gate(rebatching: Rebatching<Self>) -> Gate;
}

impl GateKind for Boolean {
    fn output_gate(output: Output<Self>) -> Gate {
        Gate::BooleanOutput(output)
    }

    fn rebatching_gate(rebatching: Rebatching<Self>) -> Gate {
        Gate::BooleanRebatching(rebatching)
    }
}

impl GateKind for Arithmetic {
    fn output_gate(output: Output<Self>) -> Gate {
        Gate::IntegerOutput(output)
    }

    fn rebatching_gate(rebatching: Rebatching<Self>) -> Gate {
        Gate::IntegerRebatching(rebatching)
    }
}

impl Gate {
    pub(crate) fn is_free(&self) -> bool {
        match self {
            Gate::And { free, .. } | Gate::Mult { free, .. } => *free,
            Gate::CompositeAnd { .. } => false,
            Gate::BooleanOutput(output) => !output.secret,
            Gate::IntegerOutput(output) => !output.secret,
            _ => true,
        }
    }

    /// The wires the gate reads or writes.
    fn wires(&self) -> (Vec<WireId<Boolean>>, Vec<WireId<Arithmetic>>) {
        match self {
            Gate::Input => (vec![], vec![]),
            Gate::Xor {
                left,
                right,
                output,
            }
            | Gate::And {
                left,
                right,
                output,
                ..
            } => (vec![*left, *right, *output], vec![]),
            Gate::Not { input, output } => (vec![*input, *output], vec![]),
            Gate::CompositeAnd {
                left,
                rights,
                outputs,
                ..
            } => {
                let mut wires = vec![*left];
                wires.extend(rights.iter().chain(outputs));
                (wires, vec![])
            }
            Gate::Plus {
                left,
                right,
                output,
            }
            | Gate::Mult {
                left,
                right,
                output,
                ..
            } => (vec![], vec![*left, *right, *output]),
            Gate::Neg { input, output } => (vec![], vec![*input, *output]),
            Gate::BooleanOutput(o) => (vec![o.input, o.output], vec![]),
            Gate::IntegerOutput(o) => (vec![], vec![o.input, o.output]),
            Gate::BooleanRebatching(r) => {
                (r.inputs.iter().chain(&r.outputs).copied().collect(), vec![])
            }
            Gate::IntegerRebatching(r) => {
                (vec![], r.inputs.iter().chain(&r.outputs).copied().collect())
            }
        }
    }

    /// Adds a reference to every wire of the gate.
    pub(crate) fn hold(&self, wires: &mut WireKeeper) -> Result<(), Error> {
        let (booleans, integers) = self.wires();
        booleans
            .into_iter()
            .try_for_each(|w| wires.increase_reference(w))?;
        integers
            .into_iter()
            .try_for_each(|w| wires.increase_reference(w))
    }

    /// Drops the references taken by [`Gate::hold`].
    pub(crate) fn release(self, wires: &mut WireKeeper) -> Result<(), Error> {
        let (booleans, integers) = self.wires();
        booleans
            .into_iter()
            .try_for_each(|w| wires.decrease_reference(w))?;
        integers
            .into_iter()
            .try_for_each(|w| wires.decrease_reference(w))
    }

    /// Evaluates a free gate, or schedules the engine operation or reveal of
    /// a non-free gate.
    pub(crate) fn compute<C, B, A>(
        &mut self,
        engine: &mut SecretShareEngine<C, B, A>,
        wires: &mut WireKeeper,
        reveals: &mut Reveals,
    ) -> Result<(), Error>
    where
        C: Channel,
        B: BooleanTupleGenerator,
        A: ArithmeticTupleGenerator,
    {
        match self {
            Gate::Input => {}
            Gate::Xor {
                left,
                right,
                output,
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                let value = match (wires.is_secret(*left)?, wires.is_secret(*right)?) {
                    (true, false) => engine.asymmetric_xor(l, r)?,
                    (false, true) => engine.asymmetric_xor(r, l)?,
                    _ => engine.symmetric_xor(l, r)?,
                };
                wires.set_value(*output, value)?;
            }
            Gate::Not { input, output } => {
                let value = if wires.is_secret(*input)? {
                    engine.asymmetric_not(wires.value(*input)?)
                } else {
                    engine.symmetric_not(wires.value(*input)?)
                };
                wires.set_value(*output, value)?;
            }
            Gate::And {
                left,
                right,
                output,
                free: true,
                ..
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                let value = if wires.is_secret(*right)? {
                    engine.free_and(r, l)?
                } else {
                    engine.free_and(l, r)?
                };
                wires.set_value(*output, value)?;
            }
            Gate::And {
                left, right, index, ..
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                *index = Some(engine.schedule_and(l.to_vec(), r.to_vec())?);
            }
            Gate::CompositeAnd {
                left,
                rights,
                index,
                ..
            } => {
                let rights = rights
                    .iter()
                    .map(|r| Ok(wires.value(*r)?.to_vec()))
                    .collect::<Result<Vec<_>, Error>>()?;
                let left = wires.value(*left)?.to_vec();
                *index = Some(engine.schedule_composite_and(left, rights)?);
            }
            Gate::Plus {
                left,
                right,
                output,
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                let value = match (wires.is_secret(*left)?, wires.is_secret(*right)?) {
                    (true, false) => engine.asymmetric_plus(l, r)?,
                    (false, true) => engine.asymmetric_plus(r, l)?,
                    _ => engine.symmetric_plus(l, r)?,
                };
                wires.set_value(*output, value)?;
            }
            Gate::Neg { input, output } => {
                let value = engine.neg(wires.value(*input)?);
                wires.set_value(*output, value)?;
            }
            Gate::Mult {
                left,
                right,
                output,
                free: true,
                ..
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                let value = if wires.is_secret(*right)? {
                    engine.free_mult(r, l)?
                } else {
                    engine.free_mult(l, r)?
                };
                wires.set_value(*output, value)?;
            }
            Gate::Mult {
                left, right, index, ..
            } => {
                let (l, r) = (wires.value(*left)?, wires.value(*right)?);
                *index = Some(engine.schedule_mult(l.to_vec(), r.to_vec())?);
            }
            Gate::BooleanOutput(output) => output.compute(wires, reveals)?,
            Gate::IntegerOutput(output) => output.compute(wires, reveals)?,
            Gate::BooleanRebatching(r) => r.compute(wires, engine.party_id())?,
            Gate::IntegerRebatching(r) => r.compute(wires, engine.party_id())?,
        }
        Ok(())
    }

    /// Stores the results of a non-free gate once the engine has executed
    /// its operations and the reveals are done.
    pub(crate) fn collect_result<C, B, A>(
        &mut self,
        engine: &mut SecretShareEngine<C, B, A>,
        wires: &mut WireKeeper,
        revealed: &mut Reveals,
    ) -> Result<(), Error>
    where
        C: Channel,
        B: BooleanTupleGenerator,
        A: ArithmeticTupleGenerator,
    {
        match self {
            Gate::And {
                output,
                index: Some(index),
                ..
            } => wires.set_value(*output, engine.and_result(*index)?),
            Gate::CompositeAnd {
                outputs,
                index: Some(index),
                ..
            } => {
                let values = engine.composite_and_result(*index)?;
                for (output, value) in outputs.iter().zip(values) {
                    wires.set_value(*output, value)?;
                }
                Ok(())
            }
            Gate::Mult {
                output,
                index: Some(index),
                ..
            } => wires.set_value(*output, engine.mult_result(*index)?),
            Gate::BooleanOutput(output) if output.secret => output.collect_result(wires, revealed),
            Gate::IntegerOutput(output) if output.secret => output.collect_result(wires, revealed),
            _ => Ok(()),
        }
    }
}
