//! The secret-share engine: local gates, Beaver multiplication and reveals.
//!
//! Boolean values are XOR-shared and integers are additively shared modulo
//! `2^64` among all parties. Every operation works on a batch of lanes, one
//! share per lane.
//!
//! Non-linear gates are first scheduled and then executed together by
//! [`SecretShareEngine::execute_scheduled_operations`], which needs a single
//! round of communication for everything scheduled since the last execution.
use std::collections::BTreeMap;

use tracing::{Level, debug, instrument, trace};

use crate::{
    Error,
    agent::{AgentFactory, CommunicationAgent, TrafficStats},
    channel::Channel,
    config::MpcConfig,
    crypto::Prg,
    tuple_generator::{
        AnyArithmeticTupleGenerator, AnyBooleanTupleGenerator, ArithmeticTupleGenerator,
        BooleanTuple, BooleanTupleGenerator, CompositeBooleanTuple, IntegerTuple, TupleBuffer,
        create_arithmetic_tuple_generator, create_boolean_tuple_generator,
    },
};

/// An engine using the tuple generators selected by [`MpcConfig`].
pub type DefaultEngine<C> =
    SecretShareEngine<C, AnyBooleanTupleGenerator<C>, AnyArithmeticTupleGenerator<C>>;

#[derive(Debug, Default)]
struct Scheduled {
    and: Vec<(Vec<bool>, Vec<bool>)>,
    composite: Vec<(Vec<bool>, Vec<Vec<bool>>)>,
    mult: Vec<(Vec<u64>, Vec<u64>)>,
}

#[derive(Debug, Default)]
struct Executed {
    and: Vec<Option<Vec<bool>>>,
    composite: Vec<Option<Vec<Vec<bool>>>>,
    mult: Vec<Option<Vec<u64>>>,
}

/// Holds the connections and correlated randomness of one party.
pub struct SecretShareEngine<C: Channel, B, A> {
    party_id: usize,
    num_parties: usize,
    agents: BTreeMap<usize, CommunicationAgent<C>>,
    prgs: BTreeMap<usize, Prg>,
    boolean_generator: B,
    arithmetic_generator: A,
    boolean_tuples: TupleBuffer<BooleanTuple>,
    integer_tuples: TupleBuffer<IntegerTuple>,
    scheduled: Scheduled,
    executed: Executed,
}

fn check_lanes(op: &str, left: usize, right: usize) -> Result<(), Error> {
    if left != right {
        return Err(Error::Construction(format!(
            "{op} of wires with {left} and {right} lanes"
        )));
    }
    Ok(())
}

impl<C: Channel> DefaultEngine<C> {
    /// Creates the tuple generators selected by `config` and initializes the
    /// engine.
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
    ) -> Result<Self, Error> {
        config.validate()?;
        let boolean = create_boolean_tuple_generator(config, factory).await?;
        let arithmetic = create_arithmetic_tuple_generator(config, factory).await?;
        Self::init(config, factory, boolean, arithmetic).await
    }
}

impl<C, B, A> SecretShareEngine<C, B, A>
where
    C: Channel,
    B: BooleanTupleGenerator,
    A: ArithmeticTupleGenerator,
{
    /// Connects to every other party and agrees on one PRG seed per peer.
    #[instrument(level = Level::DEBUG, skip_all, fields(party = config.party_id), err)]
    pub async fn init<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
        boolean_generator: B,
        arithmetic_generator: A,
    ) -> Result<Self, Error> {
        config.validate()?;
        let mut local = Prg::from_entropy();
        let mut agents = BTreeMap::new();
        let mut prgs = BTreeMap::new();
        for peer in (0..config.num_parties).filter(|p| *p != config.party_id) {
            let mut agent = factory.create(peer, "secret_share_engine").await?;
            let seed = local.random_block();
            let theirs = agent.exchange_blocks("engine seed", &[seed]).await?;
            prgs.insert(peer, Prg::new(seed ^ theirs[0]));
            agents.insert(peer, agent);
        }
        debug!(peers = agents.len(), "engine initialized");
        Ok(Self {
            party_id: config.party_id,
            num_parties: config.num_parties,
            agents,
            prgs,
            boolean_generator,
            arithmetic_generator,
            boolean_tuples: TupleBuffer::new(config.boolean_buffer_size),
            integer_tuples: TupleBuffer::new(config.integer_buffer_size),
            scheduled: Scheduled::default(),
            executed: Executed::default(),
        })
    }

    /// The id of the local party.
    pub fn party_id(&self) -> usize {
        self.party_id
    }

    /// The number of parties of the computation.
    pub fn num_parties(&self) -> usize {
        self.num_parties
    }

    fn check_party(&self, party: usize) -> Result<(), Error> {
        if party >= self.num_parties {
            return Err(Error::Construction(format!(
                "party {party} does not exist in a computation of {} parties",
                self.num_parties
            )));
        }
        Ok(())
    }

    fn agent(&mut self, peer: usize) -> Result<&mut CommunicationAgent<C>, Error> {
        self.agents
            .get_mut(&peer)
            .ok_or_else(|| Error::Construction(format!("no connection to party {peer}")))
    }

    fn prg(&mut self, peer: usize) -> Result<&mut Prg, Error> {
        self.prgs
            .get_mut(&peer)
            .ok_or_else(|| Error::Construction(format!("no shared PRG with party {peer}")))
    }

    /// Shares the private boolean input of `owner`.
    ///
    /// All parties call this with the same number of lanes. Only the owner's
    /// `values` are used, the other parties may pass placeholders.
    pub fn set_bool_input(&mut self, owner: usize, values: &[bool]) -> Result<Vec<bool>, Error> {
        self.check_party(owner)?;
        let n = values.len();
        if owner != self.party_id {
            return Ok(self.prg(owner)?.random_bits(n));
        }
        let mut share = values.to_vec();
        for prg in self.prgs.values_mut() {
            let mask = prg.random_bits(n);
            share.iter_mut().zip(mask).for_each(|(s, m)| *s ^= m);
        }
        Ok(share)
    }

    /// Shares the private integer input of `owner`, see
    /// [`SecretShareEngine::set_bool_input`].
    pub fn set_integer_input(&mut self, owner: usize, values: &[u64]) -> Result<Vec<u64>, Error> {
        self.check_party(owner)?;
        let n = values.len();
        if owner != self.party_id {
            return Ok(self.prg(owner)?.random_u64s(n));
        }
        let mut share = values.to_vec();
        for prg in self.prgs.values_mut() {
            let mask = prg.random_u64s(n);
            share
                .iter_mut()
                .zip(mask)
                .for_each(|(s, m)| *s = s.wrapping_sub(m));
        }
        Ok(share)
    }

    /// XOR of two shared values.
    pub fn symmetric_xor(&self, left: &[bool], right: &[bool]) -> Result<Vec<bool>, Error> {
        check_lanes("XOR", left.len(), right.len())?;
        Ok(left.iter().zip(right).map(|(l, r)| l ^ r).collect())
    }

    /// XOR of a shared value with a public value, applied by party 0 only.
    pub fn asymmetric_xor(&self, secret: &[bool], public: &[bool]) -> Result<Vec<bool>, Error> {
        check_lanes("XOR", secret.len(), public.len())?;
        if self.party_id != 0 {
            return Ok(secret.to_vec());
        }
        Ok(secret.iter().zip(public).map(|(s, p)| s ^ p).collect())
    }

    /// Negation of a value known to every party.
    pub fn symmetric_not(&self, value: &[bool]) -> Vec<bool> {
        value.iter().map(|v| !v).collect()
    }

    /// Negation of a shared value, applied by party 0 only.
    pub fn asymmetric_not(&self, secret: &[bool]) -> Vec<bool> {
        if self.party_id != 0 {
            return secret.to_vec();
        }
        self.symmetric_not(secret)
    }

    /// AND of a shared value with a public value, no communication needed.
    pub fn free_and(&self, secret: &[bool], public: &[bool]) -> Result<Vec<bool>, Error> {
        check_lanes("AND", secret.len(), public.len())?;
        Ok(secret.iter().zip(public).map(|(s, p)| s & p).collect())
    }

    /// Sum of two shared values.
    pub fn symmetric_plus(&self, left: &[u64], right: &[u64]) -> Result<Vec<u64>, Error> {
        check_lanes("PLUS", left.len(), right.len())?;
        Ok(left.iter().zip(right).map(|(l, r)| l.wrapping_add(*r)).collect())
    }

    /// Sum of a shared value and a public value, added by party 0 only.
    pub fn asymmetric_plus(&self, secret: &[u64], public: &[u64]) -> Result<Vec<u64>, Error> {
        check_lanes("PLUS", secret.len(), public.len())?;
        if self.party_id != 0 {
            return Ok(secret.to_vec());
        }
        Ok(secret
            .iter()
            .zip(public)
            .map(|(s, p)| s.wrapping_add(*p))
            .collect())
    }

    /// Negation modulo `2^64`, valid for shared and public values alike.
    pub fn neg(&self, value: &[u64]) -> Vec<u64> {
        value.iter().map(|v| v.wrapping_neg()).collect()
    }

    /// Product of a shared value and a public value.
    pub fn free_mult(&self, secret: &[u64], public: &[u64]) -> Result<Vec<u64>, Error> {
        check_lanes("MULT", secret.len(), public.len())?;
        Ok(secret
            .iter()
            .zip(public)
            .map(|(s, p)| s.wrapping_mul(*p))
            .collect())
    }

    /// Schedules the AND of two shared values and returns the index of its
    /// result.
    pub fn schedule_and(&mut self, left: Vec<bool>, right: Vec<bool>) -> Result<usize, Error> {
        check_lanes("AND", left.len(), right.len())?;
        self.scheduled.and.push((left, right));
        Ok(self.scheduled.and.len() - 1)
    }

    /// Schedules `left & right[i]` for every `i` and returns the index of its
    /// result.
    pub fn schedule_composite_and(
        &mut self,
        left: Vec<bool>,
        rights: Vec<Vec<bool>>,
    ) -> Result<usize, Error> {
        for right in &rights {
            check_lanes("composite AND", left.len(), right.len())?;
        }
        self.scheduled.composite.push((left, rights));
        Ok(self.scheduled.composite.len() - 1)
    }

    /// Schedules the product of two shared values and returns the index of
    /// its result.
    pub fn schedule_mult(&mut self, left: Vec<u64>, right: Vec<u64>) -> Result<usize, Error> {
        check_lanes("MULT", left.len(), right.len())?;
        self.scheduled.mult.push((left, right));
        Ok(self.scheduled.mult.len() - 1)
    }

    async fn take_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        let refill = self.boolean_tuples.refill_size(n);
        if refill > 0 {
            let tuples = self.boolean_generator.get_boolean_tuples(refill).await?;
            self.boolean_tuples.refill(tuples);
        }
        self.boolean_tuples.take(n)
    }

    async fn take_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error> {
        let refill = self.integer_tuples.refill_size(n);
        if refill > 0 {
            let tuples = self.arithmetic_generator.get_integer_tuples(refill).await?;
            self.integer_tuples.refill(tuples);
        }
        self.integer_tuples.take(n)
    }

    async fn take_composite_tuples(
        &mut self,
        composite: &[(Vec<bool>, Vec<Vec<bool>>)],
    ) -> Result<BTreeMap<usize, std::vec::IntoIter<CompositeBooleanTuple>>, Error> {
        let mut widths = BTreeMap::new();
        for (left, rights) in composite.iter().filter(|(_, r)| !r.is_empty()) {
            *widths.entry(rights.len()).or_insert(0) += left.len();
        }
        if widths.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut tuples = self.boolean_generator.get_composite_tuples(&widths).await?;
        let mut iters = BTreeMap::new();
        for (width, count) in widths {
            let batch = tuples.remove(&width).unwrap_or_default();
            if batch.len() < count {
                return Err(Error::InvalidAccess(format!(
                    "{count} composite tuples of width {width} requested, got {}",
                    batch.len()
                )));
            }
            iters.insert(width, batch.into_iter());
        }
        Ok(iters)
    }

    /// Executes everything scheduled since the last call.
    ///
    /// Consumes one tuple per AND and MULT lane and one composite tuple per
    /// composite AND lane, and opens all masked values in one round.
    /// Composite ANDs fall back to plain ANDs if the boolean tuple generator
    /// has no composite tuples.
    #[instrument(level = Level::DEBUG, skip_all, fields(party = self.party_id), err)]
    pub async fn execute_scheduled_operations(&mut self) -> Result<(), Error> {
        let Scheduled {
            mut and,
            composite,
            mult,
        } = std::mem::take(&mut self.scheduled);
        let and_count = and.len();
        let (composite, fallback) = if self.boolean_generator.supports_composite() {
            (composite, Vec::new())
        } else {
            (Vec::new(), composite)
        };
        for (left, rights) in &fallback {
            and.extend(rights.iter().map(|r| (left.clone(), r.clone())));
        }

        let and_lanes = and.iter().map(|(l, _)| l.len()).sum();
        let and_tuples = self.take_boolean_tuples(and_lanes).await?;
        let mut composite_tuples = self.take_composite_tuples(&composite).await?;
        let mult_lanes = mult.iter().map(|(l, _)| l.len()).sum();
        let mult_tuples = self.take_integer_tuples(mult_lanes).await?;
        debug!(and_lanes, mult_lanes, composite = composite.len(), "executing");

        let mut masked = Vec::new();
        let mut offset = 0;
        for (left, right) in &and {
            let tuples = &and_tuples[offset..offset + left.len()];
            masked.extend(left.iter().zip(tuples).map(|(x, t)| x ^ t.a));
            masked.extend(right.iter().zip(tuples).map(|(y, t)| y ^ t.b));
            offset += left.len();
        }
        let mut composite_batches = Vec::with_capacity(composite.len());
        for (left, rights) in &composite {
            let tuples: Vec<CompositeBooleanTuple> = match composite_tuples.get_mut(&rights.len()) {
                Some(iter) => iter.take(left.len()).collect(),
                None => Vec::new(),
            };
            if !rights.is_empty() {
                masked.extend(left.iter().zip(&tuples).map(|(x, t)| x ^ t.a));
                for (j, right) in rights.iter().enumerate() {
                    masked.extend(right.iter().zip(&tuples).map(|(y, t)| y ^ t.b[j]));
                }
            }
            composite_batches.push(tuples);
        }
        let opened = if masked.is_empty() {
            Vec::new()
        } else {
            self.open_to_all(&masked).await?
        };

        let is_first = self.party_id == 0;
        let mut cursor = 0;
        let mut and_results = Vec::with_capacity(and.len());
        offset = 0;
        for (left, _) in &and {
            let n = left.len();
            let tuples = &and_tuples[offset..offset + n];
            let (e, d) = opened[cursor..cursor + 2 * n].split_at(n);
            let z = (0..n)
                .map(|i| {
                    let t = &tuples[i];
                    t.c ^ (e[i] & t.b) ^ (d[i] & t.a) ^ (is_first & e[i] & d[i])
                })
                .collect();
            and_results.push(Some(z));
            cursor += 2 * n;
            offset += n;
        }
        let mut composite_results: Vec<Option<Vec<Vec<bool>>>> =
            Vec::with_capacity(composite.len() + fallback.len());
        for ((left, rights), tuples) in composite.iter().zip(&composite_batches) {
            if rights.is_empty() {
                composite_results.push(Some(Vec::new()));
                continue;
            }
            let n = left.len();
            let e = &opened[cursor..cursor + n];
            cursor += n;
            let mut outputs = Vec::with_capacity(rights.len());
            for j in 0..rights.len() {
                let d = &opened[cursor..cursor + n];
                let z = (0..n)
                    .map(|i| {
                        let t = &tuples[i];
                        t.c[j] ^ (e[i] & t.b[j]) ^ (d[i] & t.a) ^ (is_first & e[i] & d[i])
                    })
                    .collect();
                outputs.push(z);
                cursor += n;
            }
            composite_results.push(Some(outputs));
        }
        let mut plain = and_results.split_off(and_count).into_iter();
        for (_, rights) in &fallback {
            let outputs = plain.by_ref().take(rights.len()).flatten().collect();
            composite_results.push(Some(outputs));
        }

        let mult_results = self.execute_mult(&mult, &mult_tuples).await?;

        self.executed = Executed {
            and: and_results,
            composite: composite_results,
            mult: mult_results,
        };
        Ok(())
    }

    async fn execute_mult(
        &mut self,
        mult: &[(Vec<u64>, Vec<u64>)],
        tuples: &[IntegerTuple],
    ) -> Result<Vec<Option<Vec<u64>>>, Error> {
        let mut masked = Vec::with_capacity(2 * tuples.len());
        let mut offset = 0;
        for (left, right) in mult {
            let batch = &tuples[offset..offset + left.len()];
            masked.extend(left.iter().zip(batch).map(|(x, t)| x.wrapping_sub(t.a)));
            masked.extend(right.iter().zip(batch).map(|(y, t)| y.wrapping_sub(t.b)));
            offset += left.len();
        }
        let opened = if masked.is_empty() {
            Vec::new()
        } else {
            self.open_integers_to_all(&masked).await?
        };
        let is_first = self.party_id == 0;
        let mut results = Vec::with_capacity(mult.len());
        let mut cursor = 0;
        offset = 0;
        for (left, _) in mult {
            let n = left.len();
            let batch = &tuples[offset..offset + n];
            let (e, d) = opened[cursor..cursor + 2 * n].split_at(n);
            let z = (0..n)
                .map(|i| {
                    let t = &batch[i];
                    let mut z = t
                        .c
                        .wrapping_add(e[i].wrapping_mul(t.b))
                        .wrapping_add(d[i].wrapping_mul(t.a));
                    if is_first {
                        z = z.wrapping_add(e[i].wrapping_mul(d[i]));
                    }
                    z
                })
                .collect();
            results.push(Some(z));
            cursor += 2 * n;
            offset += n;
        }
        Ok(results)
    }

    /// The result of the AND scheduled at `index`. Can be taken once.
    pub fn and_result(&mut self, index: usize) -> Result<Vec<bool>, Error> {
        take_result(&mut self.executed.and, index, "AND")
    }

    /// The result of the composite AND scheduled at `index`. Can be taken once.
    pub fn composite_and_result(&mut self, index: usize) -> Result<Vec<Vec<bool>>, Error> {
        take_result(&mut self.executed.composite, index, "composite AND")
    }

    /// The result of the MULT scheduled at `index`. Can be taken once.
    pub fn mult_result(&mut self, index: usize) -> Result<Vec<u64>, Error> {
        take_result(&mut self.executed.mult, index, "MULT")
    }

    /// Schedules and executes a single AND.
    pub async fn compute_and(
        &mut self,
        left: Vec<bool>,
        right: Vec<bool>,
    ) -> Result<Vec<bool>, Error> {
        let index = self.schedule_and(left, right)?;
        self.execute_scheduled_operations().await?;
        self.and_result(index)
    }

    /// Schedules and executes a single MULT.
    pub async fn compute_mult(&mut self, left: Vec<u64>, right: Vec<u64>) -> Result<Vec<u64>, Error> {
        let index = self.schedule_mult(left, right)?;
        self.execute_scheduled_operations().await?;
        self.mult_result(index)
    }

    /// Reveals XOR-shared `shares` to `party`.
    ///
    /// Every other party sends its shares to `party` and gets zeros back, so
    /// the traffic pattern does not depend on who learns the value.
    #[instrument(level = Level::DEBUG, skip_all, fields(party = party, lanes = shares.len()), err)]
    pub async fn reveal_to_party(
        &mut self,
        party: usize,
        shares: &[bool],
    ) -> Result<Vec<bool>, Error> {
        self.check_party(party)?;
        if party != self.party_id {
            self.agent(party)?.send_bools("reveal", shares).await?;
            return Ok(vec![false; shares.len()]);
        }
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.recv_bools("reveal", shares.len()).await?;
            value.iter_mut().zip(theirs).for_each(|(v, t)| *v ^= t);
        }
        Ok(value)
    }

    /// Reveals additively shared `shares` to `party`, see
    /// [`SecretShareEngine::reveal_to_party`].
    #[instrument(level = Level::DEBUG, skip_all, fields(party = party, lanes = shares.len()), err)]
    pub async fn reveal_integers_to_party(
        &mut self,
        party: usize,
        shares: &[u64],
    ) -> Result<Vec<u64>, Error> {
        self.check_party(party)?;
        if party != self.party_id {
            self.agent(party)?.send_u64s("reveal", shares).await?;
            return Ok(vec![0; shares.len()]);
        }
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.recv_u64s("reveal", shares.len()).await?;
            value
                .iter_mut()
                .zip(theirs)
                .for_each(|(v, t)| *v = v.wrapping_add(t));
        }
        Ok(value)
    }

    /// Reveals XOR-shared `shares` to every party.
    ///
    /// Peers are handled in ascending order and the lower id of each pair
    /// sends first.
    pub async fn open_to_all(&mut self, shares: &[bool]) -> Result<Vec<bool>, Error> {
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.exchange_bools("open", shares).await?;
            value.iter_mut().zip(theirs).for_each(|(v, t)| *v ^= t);
        }
        trace!(lanes = shares.len(), "opened boolean values");
        Ok(value)
    }

    /// Reveals additively shared `shares` to every party.
    pub async fn open_integers_to_all(&mut self, shares: &[u64]) -> Result<Vec<u64>, Error> {
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.exchange_u64s("open", shares).await?;
            value
                .iter_mut()
                .zip(theirs)
                .for_each(|(v, t)| *v = v.wrapping_add(t));
        }
        trace!(lanes = shares.len(), "opened integer values");
        Ok(value)
    }

    /// Tuples that are generated but not yet consumed, boolean and integer.
    pub fn buffered_tuples(&self) -> (usize, usize) {
        (self.boolean_tuples.len(), self.integer_tuples.len())
    }

    /// Traffic of the engine's own connections and of both tuple generators.
    pub fn traffic_statistics(&self) -> TrafficStats {
        self.agents
            .values()
            .fold(TrafficStats::default(), |acc, a| acc + a.traffic_statistics())
            + self.boolean_generator.traffic_statistics()
            + self.arithmetic_generator.traffic_statistics()
    }
}

fn take_result<T>(results: &mut [Option<T>], index: usize, op: &str) -> Result<T, Error> {
    results
        .get_mut(index)
        .and_then(Option::take)
        .ok_or_else(|| Error::InvalidAccess(format!("no {op} result at index {index}")))
}

#[cfg(test)]
mod tests {
    use futures::future::try_join_all;

    use super::*;
    use crate::{
        agent::InMemoryAgentFactory,
        config::TupleGeneratorKind,
        tuple_generator::{DummyTupleGenerator, NullTupleGenerator},
    };

    fn dummy_config(num_parties: usize) -> MpcConfig {
        MpcConfig {
            num_parties,
            tuple_generator: TupleGeneratorKind::Dummy,
            boolean_buffer_size: 64,
            integer_buffer_size: 16,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn inputs_are_shared() {
        let config = dummy_config(3);
        let factories = InMemoryAgentFactory::network(3);
        let shares = try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut engine = DefaultEngine::create(&config, &mut f).await?;
                let bools = engine.set_bool_input(1, &[true, false, true, true])?;
                let ints = engine.set_integer_input(2, &[7, u64::MAX, 0])?;
                Ok::<_, Error>((bools, ints, engine.traffic_statistics()))
            }
        }))
        .await
        .unwrap();
        let mut bools = vec![false; 4];
        let mut ints = vec![0u64; 3];
        for (b, i, _) in &shares {
            bools.iter_mut().zip(b).for_each(|(v, s)| *v ^= s);
            ints.iter_mut().zip(i).for_each(|(v, s)| *v = v.wrapping_add(*s));
        }
        assert_eq!(bools, vec![true, false, true, true]);
        assert_eq!(ints, vec![7, u64::MAX, 0]);
        // only the seed exchange touches the network
        for (_, _, traffic) in shares {
            assert_eq!(traffic.sent, 2 * 16);
        }
    }

    #[tokio::test]
    async fn scheduled_gates_and_reveal() {
        let config = dummy_config(2);
        let factories = InMemoryAgentFactory::network(2);
        let x = [true, true, false, false, true];
        let y = [true, false, true, false, true];
        let results = try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut engine = DefaultEngine::create(&config, &mut f).await?;
                let a = engine.set_bool_input(0, &x)?;
                let b = engine.set_bool_input(1, &y)?;
                let u = engine.set_integer_input(0, &[3, 5, u64::MAX])?;
                let v = engine.set_integer_input(1, &[4, 6, 2])?;
                let and = engine.schedule_and(a.clone(), b.clone())?;
                let composite = engine.schedule_composite_and(a.clone(), vec![b.clone(), a])?;
                let mult = engine.schedule_mult(u, v)?;
                engine.execute_scheduled_operations().await?;
                let and = engine.and_result(and)?;
                assert!(engine.and_result(0).is_err());
                let composite = engine.composite_and_result(composite)?;
                let mult = engine.mult_result(mult)?;
                let and = engine.reveal_to_party(1, &and).await?;
                let first = engine.open_to_all(&composite[0]).await?;
                let second = engine.open_to_all(&composite[1]).await?;
                let mult = engine.reveal_integers_to_party(0, &mult).await?;
                Ok::<_, Error>((and, first, second, mult))
            }
        }))
        .await
        .unwrap();
        let expected: Vec<bool> = x.iter().zip(&y).map(|(x, y)| x & y).collect();
        assert_eq!(results[0].0, vec![false; 5]);
        assert_eq!(results[1].0, expected);
        for (_, first, second, _) in &results {
            assert_eq!(first, &expected);
            assert_eq!(second, &x.to_vec());
        }
        assert_eq!(results[0].3, vec![12, 30, u64::MAX.wrapping_mul(2)]);
        assert_eq!(results[1].3, vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn null_generator_rejects_and() {
        let config = MpcConfig {
            tuple_generator: TupleGeneratorKind::Null,
            ..dummy_config(2)
        };
        let factories = InMemoryAgentFactory::network(2);
        let results = futures::future::join_all(factories.into_iter().enumerate().map(
            |(p, mut f)| {
                let config = config.for_party(p);
                async move {
                    let mut engine = SecretShareEngine::init(
                        &config,
                        &mut f,
                        NullTupleGenerator,
                        DummyTupleGenerator::new(p),
                    )
                    .await?;
                    let x = engine.set_integer_input(0, &[2, 3])?;
                    let product = engine.compute_mult(x.clone(), x).await?;
                    assert_eq!(product.len(), 2);
                    engine.compute_and(vec![true], vec![false]).await
                }
            },
        ))
        .await;
        for result in results {
            assert!(matches!(result, Err(Error::InvalidAccess(_))));
        }
    }

    #[tokio::test]
    async fn lane_mismatch_is_a_construction_error() {
        let config = dummy_config(2);
        let mut factories = InMemoryAgentFactory::network(2);
        let mut second = factories.pop().unwrap();
        let mut first = factories.pop().unwrap();
        let second_config = config.for_party(1);
        let (a, b) = tokio::try_join!(
            DefaultEngine::create(&config, &mut first),
            DefaultEngine::create(&second_config, &mut second)
        )
        .unwrap();
        assert!(matches!(
            a.symmetric_xor(&[true], &[true, false]),
            Err(Error::Construction(_))
        ));
        let mut b = b;
        assert!(matches!(
            b.schedule_and(vec![true; 2], vec![true; 3]),
            Err(Error::Construction(_))
        ));
        assert!(matches!(
            b.set_bool_input(2, &[true]),
            Err(Error::Construction(_))
        ));
    }
}
