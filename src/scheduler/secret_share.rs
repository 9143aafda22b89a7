use tracing::debug;

use crate::{
    Error,
    agent::{AgentFactory, TrafficStats},
    channel::Channel,
    config::MpcConfig,
    engine::SecretShareEngine,
    scheduler::{
        Arithmetic, Boolean, GateStats, Scheduler, WireId, WireStats, gate::GateKind,
        gate_keeper::GateKeeper,
    },
    tuple_generator::{
        AnyArithmeticTupleGenerator, AnyBooleanTupleGenerator, ArithmeticTupleGenerator,
        BooleanTupleGenerator,
    },
};

/// Evaluates gates on secret shares with a [`SecretShareEngine`].
///
/// With `EAGER`, every operation is evaluated before it returns. Otherwise
/// gates are only recorded, and pending levels are evaluated once a value is
/// needed, on [`Scheduler::flush`], or when more than `max_unexecuted_gates`
/// gates are pending at the next operation that may communicate.
pub struct SecretShareScheduler<C: Channel, B, A, const EAGER: bool> {
    engine: SecretShareEngine<C, B, A>,
    gates: GateKeeper,
}

/// Evaluates every gate right away.
pub type EagerScheduler<C, B, A> = SecretShareScheduler<C, B, A, true>;

/// Batches independent gates into shared rounds of communication.
pub type LazyScheduler<C, B, A> = SecretShareScheduler<C, B, A, false>;

/// An [`EagerScheduler`] with the tuple generators selected by [`MpcConfig`].
pub type DefaultEagerScheduler<C> =
    EagerScheduler<C, AnyBooleanTupleGenerator<C>, AnyArithmeticTupleGenerator<C>>;

/// A [`LazyScheduler`] with the tuple generators selected by [`MpcConfig`].
pub type DefaultLazyScheduler<C> =
    LazyScheduler<C, AnyBooleanTupleGenerator<C>, AnyArithmeticTupleGenerator<C>>;

impl<C: Channel, const EAGER: bool>
    SecretShareScheduler<C, AnyBooleanTupleGenerator<C>, AnyArithmeticTupleGenerator<C>, EAGER>
{
    /// Creates the engine and tuple generators selected by `config`.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
    ) -> Result<Self, Error> {
        let engine = SecretShareEngine::create(config, factory).await?;
        Ok(Self::new(engine, config.max_unexecuted_gates))
    }
}

impl<C, B, A, const EAGER: bool> SecretShareScheduler<C, B, A, EAGER>
where
    C: Channel,
    B: BooleanTupleGenerator,
    A: ArithmeticTupleGenerator,
{
    /// Wraps an initialized engine.
    pub fn new(engine: SecretShareEngine<C, B, A>, max_unexecuted_gates: usize) -> Self {
        debug!(eager = EAGER, max_unexecuted_gates, "scheduler created");
        Self {
            engine,
            gates: GateKeeper::new(max_unexecuted_gates),
        }
    }

    /// The engine evaluating the gates.
    pub fn engine(&self) -> &SecretShareEngine<C, B, A> {
        &self.engine
    }

    /// Gates recorded but not evaluated yet. Always 0 for eager schedulers.
    pub fn pending_gates(&self) -> usize {
        self.gates.number_of_unexecuted_gates()
    }

    fn after_local(&mut self) -> Result<(), Error> {
        if EAGER {
            self.gates.execute_free_levels(&mut self.engine)?;
        }
        Ok(())
    }

    async fn after_network(&mut self) -> Result<(), Error> {
        if EAGER {
            return self.execute_all().await;
        }
        while self.gates.has_reached_batching_limit() {
            self.gates.execute_one_level(&mut self.engine).await?;
        }
        Ok(())
    }

    async fn execute_all(&mut self) -> Result<(), Error> {
        while self.gates.execute_one_level(&mut self.engine).await? {}
        Ok(())
    }

    /// Evaluates levels until `wire` has a value.
    async fn force<K: GateKind>(&mut self, wire: WireId<K>) -> Result<Vec<K::Value>, Error> {
        while !self.gates.wires().is_resolved(wire)? {
            if !self.gates.execute_one_level(&mut self.engine).await? {
                return Err(Error::InvalidAccess(format!(
                    "{wire:?} has no pending gate that computes it"
                )));
            }
        }
        Ok(self.gates.wires().value(wire)?.to_vec())
    }

    fn check_party(&self, party: usize) -> Result<(), Error> {
        if party >= self.engine.num_parties() {
            return Err(Error::Construction(format!(
                "party {party} does not exist in a computation of {} parties",
                self.engine.num_parties()
            )));
        }
        Ok(())
    }

    async fn extract_share<K: GateKind>(&mut self, wire: WireId<K>) -> Result<Vec<K::Value>, Error> {
        let value = self.force(wire).await?;
        if self.gates.wires().is_secret(wire)? || self.engine.party_id() == 0 {
            Ok(value)
        } else {
            Ok(vec![K::Value::default(); value.len()])
        }
    }

    async fn public_value<K: GateKind>(&mut self, wire: WireId<K>) -> Result<Vec<K::Value>, Error> {
        if self.gates.wires().is_secret(wire)? {
            return Err(Error::RuntimeType(format!(
                "{wire:?} is secret, open it before reading its value"
            )));
        }
        self.force(wire).await
    }

    async fn open<K: GateKind>(&mut self, wire: WireId<K>, party: usize) -> Result<WireId<K>, Error> {
        self.check_party(party)?;
        let output = self.gates.output(wire, party)?;
        self.after_network().await?;
        Ok(output)
    }

    fn local<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        let output = result?;
        self.after_local()?;
        Ok(output)
    }
}

impl<C, B, A, const EAGER: bool> Scheduler for SecretShareScheduler<C, B, A, EAGER>
where
    C: Channel,
    B: BooleanTupleGenerator,
    A: ArithmeticTupleGenerator,
{
    fn party_id(&self) -> usize {
        self.engine.party_id()
    }

    fn num_parties(&self) -> usize {
        self.engine.num_parties()
    }

    async fn private_boolean_input(
        &mut self,
        owner: usize,
        values: &[bool],
    ) -> Result<WireId<Boolean>, Error> {
        let share = self.engine.set_bool_input(owner, values)?;
        let wire = self.gates.input(share, true);
        self.after_local()?;
        Ok(wire)
    }

    fn public_boolean_input(&mut self, values: &[bool]) -> WireId<Boolean> {
        self.gates.input(values.to_vec(), false)
    }

    async fn recover_boolean_wire(&mut self, shares: &[bool]) -> Result<WireId<Boolean>, Error> {
        let wire = self.gates.input(shares.to_vec(), true);
        self.after_local()?;
        Ok(wire)
    }

    async fn open_boolean_to_party(
        &mut self,
        wire: WireId<Boolean>,
        party: usize,
    ) -> Result<WireId<Boolean>, Error> {
        self.open(wire, party).await
    }

    async fn extract_boolean_share(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        self.extract_share(wire).await
    }

    async fn boolean_value(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        self.public_value(wire).await
    }

    async fn and(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        let output = self.gates.and(left, right)?;
        self.after_network().await?;
        Ok(output)
    }

    fn xor(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        let result = self.gates.xor(left, right);
        self.local(result)
    }

    fn not(&mut self, wire: WireId<Boolean>) -> Result<WireId<Boolean>, Error> {
        let result = self.gates.not(wire);
        self.local(result)
    }

    async fn composite_and(
        &mut self,
        left: WireId<Boolean>,
        rights: &[WireId<Boolean>],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        let outputs = self.gates.composite_and(left, rights)?;
        self.after_network().await?;
        Ok(outputs)
    }

    fn batching_boolean(&mut self, wires: &[WireId<Boolean>]) -> Result<WireId<Boolean>, Error> {
        let result = self.gates.batching(wires);
        self.local(result)
    }

    fn unbatching_boolean(
        &mut self,
        wire: WireId<Boolean>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        let result = self.gates.unbatching(wire, sizes);
        self.local(result)
    }

    async fn private_integer_input(
        &mut self,
        owner: usize,
        values: &[u64],
    ) -> Result<WireId<Arithmetic>, Error> {
        let share = self.engine.set_integer_input(owner, values)?;
        let wire = self.gates.input(share, true);
        self.after_local()?;
        Ok(wire)
    }

    fn public_integer_input(&mut self, values: &[u64]) -> WireId<Arithmetic> {
        self.gates.input(values.to_vec(), false)
    }

    async fn recover_integer_wire(&mut self, shares: &[u64]) -> Result<WireId<Arithmetic>, Error> {
        let wire = self.gates.input(shares.to_vec(), true);
        self.after_local()?;
        Ok(wire)
    }

    async fn open_integer_to_party(
        &mut self,
        wire: WireId<Arithmetic>,
        party: usize,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.open(wire, party).await
    }

    async fn extract_integer_share(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        self.extract_share(wire).await
    }

    async fn integer_value(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        self.public_value(wire).await
    }

    fn plus(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        let result = self.gates.plus(left, right);
        self.local(result)
    }

    fn neg(&mut self, wire: WireId<Arithmetic>) -> Result<WireId<Arithmetic>, Error> {
        let result = self.gates.neg(wire);
        self.local(result)
    }

    async fn mult(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        let output = self.gates.mult(left, right)?;
        self.after_network().await?;
        Ok(output)
    }

    fn batching_integer(
        &mut self,
        wires: &[WireId<Arithmetic>],
    ) -> Result<WireId<Arithmetic>, Error> {
        let result = self.gates.batching(wires);
        self.local(result)
    }

    fn unbatching_integer(
        &mut self,
        wire: WireId<Arithmetic>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Arithmetic>>, Error> {
        let result = self.gates.unbatching(wire, sizes);
        self.local(result)
    }

    fn release_boolean(&mut self, wire: WireId<Boolean>) -> Result<(), Error> {
        self.gates.wires_mut().decrease_reference(wire)
    }

    fn release_integer(&mut self, wire: WireId<Arithmetic>) -> Result<(), Error> {
        self.gates.wires_mut().decrease_reference(wire)
    }

    fn boolean_lanes(&self, wire: WireId<Boolean>) -> Result<usize, Error> {
        self.gates.wires().lanes(wire)
    }

    fn integer_lanes(&self, wire: WireId<Arithmetic>) -> Result<usize, Error> {
        self.gates.wires().lanes(wire)
    }

    async fn flush(&mut self) -> Result<(), Error> {
        self.execute_all().await
    }

    fn traffic_statistics(&self) -> TrafficStats {
        self.engine.traffic_statistics()
    }

    fn gate_statistics(&self) -> GateStats {
        self.gates.gate_statistics()
    }

    fn wire_statistics(&self) -> WireStats {
        self.gates.wires().wire_statistics()
    }
}

#[cfg(test)]
mod tests {
    use futures::future::try_join_all;

    use super::*;
    use crate::{
        agent::InMemoryAgentFactory, channel::MemoryChannel, config::TupleGeneratorKind,
    };

    fn dummy_config(max_unexecuted_gates: usize) -> MpcConfig {
        MpcConfig {
            tuple_generator: TupleGeneratorKind::Dummy,
            boolean_buffer_size: 64,
            integer_buffer_size: 16,
            max_unexecuted_gates,
            ..Default::default()
        }
    }

    async fn and_chain<S: Scheduler>(scheduler: &mut S) -> Result<(Vec<bool>, Vec<u64>), Error> {
        let x = scheduler
            .private_boolean_input(0, &[true, true, false])
            .await?;
        let y = scheduler
            .private_boolean_input(1, &[true, false, true])
            .await?;
        let public = scheduler.public_boolean_input(&[true, true, true]);
        let and = scheduler.and(x, y).await?;
        let or = scheduler.xor(x, y)?;
        let or = scheduler.xor(or, and)?;
        let masked = scheduler.and(or, public).await?;
        let opened = scheduler.open_boolean_to_party(masked, 1).await?;
        let bits = scheduler.boolean_value(opened).await?;

        let u = scheduler.private_integer_input(1, &[3, 4]).await?;
        let v = scheduler.public_integer_input(&[10, u64::MAX]);
        let sum = scheduler.plus(u, v)?;
        let square = scheduler.mult(sum, sum).await?;
        let opened = scheduler.open_integer_to_party(square, 0).await?;
        let ints = scheduler.integer_value(opened).await?;
        Ok((bits, ints))
    }

    async fn run<const EAGER: bool>(max: usize) -> Vec<(Vec<bool>, Vec<u64>, GateStats)> {
        let config = dummy_config(max);
        let factories = InMemoryAgentFactory::network(2);
        try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut scheduler: SecretShareScheduler<MemoryChannel, _, _, EAGER> =
                    SecretShareScheduler::create(&config, &mut f).await?;
                let (bits, ints) = and_chain(&mut scheduler).await?;
                scheduler.flush().await?;
                assert_eq!(scheduler.pending_gates(), 0);
                Ok::<_, Error>((bits, ints, scheduler.gate_statistics()))
            }
        }))
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn eager_and_lazy_agree() {
        for results in [run::<true>(100).await, run::<false>(100).await, run::<false>(1).await] {
            assert_eq!(results[0].0, vec![false; 3]);
            assert_eq!(results[1].0, vec![true, true, true]);
            assert_eq!(results[0].1, vec![169, 9]);
            assert_eq!(results[1].1, vec![0, 0]);
            assert_eq!(results[0].2, results[1].2);
            assert_eq!(results[0].2.non_free, 3 + 3 + 2 + 2);
        }
    }

    #[tokio::test]
    async fn lazy_gates_wait_for_values() {
        let config = dummy_config(1_000);
        let factories = InMemoryAgentFactory::network(2);
        try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut scheduler = DefaultLazyScheduler::create(&config, &mut f).await?;
                let x = scheduler.private_boolean_input(0, &[true, false]).await?;
                let y = scheduler.private_boolean_input(1, &[true, true]).await?;
                let first = scheduler.and(x, y).await?;
                let second = scheduler.and(y, x).await?;
                assert_eq!(scheduler.pending_gates(), 4);
                let both = scheduler.xor(first, second)?;
                let share = scheduler.extract_boolean_share(both).await?;
                assert_eq!(scheduler.pending_gates(), 0);
                assert_eq!(share.len(), 2);
                scheduler.release_boolean(both)?;
                assert!(matches!(
                    scheduler.boolean_lanes(both),
                    Err(Error::InvalidAccess(_))
                ));
                Ok::<_, Error>(share)
            }
        }))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let config = dummy_config(10);
        let factories = InMemoryAgentFactory::network(2);
        try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut scheduler = DefaultEagerScheduler::create(&config, &mut f).await?;
                let secret = scheduler.private_integer_input(0, &[1, 2]).await?;
                let public = scheduler.public_integer_input(&[5, 6]);
                assert!(matches!(
                    scheduler.integer_value(secret).await,
                    Err(Error::RuntimeType(_))
                ));
                assert!(matches!(
                    scheduler.open_integer_to_party(secret, 2).await,
                    Err(Error::Construction(_))
                ));
                let short = scheduler.public_integer_input(&[1]);
                assert!(matches!(
                    scheduler.plus(secret, short),
                    Err(Error::Construction(_))
                ));
                let share = scheduler.extract_integer_share(public).await?;
                let expected = if p == 0 { vec![5, 6] } else { vec![0, 0] };
                assert_eq!(share, expected);
                Ok::<_, Error>(())
            }
        }))
        .await
        .unwrap();
    }
}
