use std::collections::BTreeMap;

use tracing::{Level, debug, instrument};

use crate::{
    Error,
    agent::{AgentFactory, CommunicationAgent, TrafficStats},
    channel::Channel,
    config::MpcConfig,
    scheduler::{
        Arithmetic, Boolean, GateStats, PlaintextScheduler, Scheduler, WireId, WireStats,
    },
};

/// A [`PlaintextScheduler`] that sends private inputs in the clear to all
/// other parties.
///
/// Unlike [`PlaintextScheduler`], non-owners may pass placeholders for
/// private inputs. Extracted shares hold the value at party 0 and zeros at
/// all other parties, recovering a wire sums the shares of all parties.
pub struct NetworkPlaintextScheduler<C: Channel> {
    plain: PlaintextScheduler,
    agents: BTreeMap<usize, CommunicationAgent<C>>,
}

impl<C: Channel> NetworkPlaintextScheduler<C> {
    /// Connects to every other party.
    #[instrument(level = Level::DEBUG, skip_all, fields(party = config.party_id), err)]
    pub async fn create<F: AgentFactory<Channel = C>>(
        config: &MpcConfig,
        factory: &mut F,
    ) -> Result<Self, Error> {
        config.validate()?;
        let plain = PlaintextScheduler::new(config.party_id, config.num_parties)?;
        let mut agents = BTreeMap::new();
        for peer in (0..config.num_parties).filter(|p| *p != config.party_id) {
            agents.insert(peer, factory.create(peer, "network_plaintext").await?);
        }
        debug!(peers = agents.len(), "network plaintext scheduler created");
        Ok(Self { plain, agents })
    }

    fn agent(&mut self, peer: usize) -> Result<&mut CommunicationAgent<C>, Error> {
        self.agents
            .get_mut(&peer)
            .ok_or_else(|| Error::Construction(format!("no connection to party {peer}")))
    }

    async fn share_bools(&mut self, owner: usize, values: &[bool]) -> Result<Vec<bool>, Error> {
        self.plain.check_party(owner)?;
        if owner == self.plain.party_id() {
            for agent in self.agents.values_mut() {
                agent.send_bools("plaintext input", values).await?;
            }
            Ok(values.to_vec())
        } else {
            let agent = self.agent(owner)?;
            Ok(agent.recv_bools("plaintext input", values.len()).await?)
        }
    }

    async fn share_u64s(&mut self, owner: usize, values: &[u64]) -> Result<Vec<u64>, Error> {
        self.plain.check_party(owner)?;
        if owner == self.plain.party_id() {
            for agent in self.agents.values_mut() {
                agent.send_u64s("plaintext input", values).await?;
            }
            Ok(values.to_vec())
        } else {
            let agent = self.agent(owner)?;
            Ok(agent.recv_u64s("plaintext input", values.len()).await?)
        }
    }

    fn share_of<T: Copy + Default>(&self, value: Vec<T>) -> Vec<T> {
        if self.plain.party_id() == 0 {
            value
        } else {
            vec![T::default(); value.len()]
        }
    }
}

impl<C: Channel> Scheduler for NetworkPlaintextScheduler<C> {
    fn party_id(&self) -> usize {
        self.plain.party_id()
    }

    fn num_parties(&self) -> usize {
        self.plain.num_parties()
    }

    async fn private_boolean_input(
        &mut self,
        owner: usize,
        values: &[bool],
    ) -> Result<WireId<Boolean>, Error> {
        let values = self.share_bools(owner, values).await?;
        Ok(self.plain.input(values, true))
    }

    fn public_boolean_input(&mut self, values: &[bool]) -> WireId<Boolean> {
        self.plain.public_boolean_input(values)
    }

    async fn recover_boolean_wire(&mut self, shares: &[bool]) -> Result<WireId<Boolean>, Error> {
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.exchange_bools("plaintext recover", shares).await?;
            value.iter_mut().zip(theirs).for_each(|(v, s)| *v ^= s);
        }
        Ok(self.plain.input(value, true))
    }

    async fn open_boolean_to_party(
        &mut self,
        wire: WireId<Boolean>,
        party: usize,
    ) -> Result<WireId<Boolean>, Error> {
        self.plain.open_boolean_to_party(wire, party).await
    }

    async fn extract_boolean_share(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        let value = self.plain.value_of(wire)?;
        Ok(self.share_of(value))
    }

    async fn boolean_value(&mut self, wire: WireId<Boolean>) -> Result<Vec<bool>, Error> {
        self.plain.boolean_value(wire).await
    }

    async fn and(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        self.plain.and(left, right).await
    }

    fn xor(
        &mut self,
        left: WireId<Boolean>,
        right: WireId<Boolean>,
    ) -> Result<WireId<Boolean>, Error> {
        self.plain.xor(left, right)
    }

    fn not(&mut self, wire: WireId<Boolean>) -> Result<WireId<Boolean>, Error> {
        self.plain.not(wire)
    }

    async fn composite_and(
        &mut self,
        left: WireId<Boolean>,
        rights: &[WireId<Boolean>],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        self.plain.composite_and(left, rights).await
    }

    fn batching_boolean(&mut self, wires: &[WireId<Boolean>]) -> Result<WireId<Boolean>, Error> {
        self.plain.batching_boolean(wires)
    }

    fn unbatching_boolean(
        &mut self,
        wire: WireId<Boolean>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Boolean>>, Error> {
        self.plain.unbatching_boolean(wire, sizes)
    }

    async fn private_integer_input(
        &mut self,
        owner: usize,
        values: &[u64],
    ) -> Result<WireId<Arithmetic>, Error> {
        let values = self.share_u64s(owner, values).await?;
        Ok(self.plain.input(values, true))
    }

    fn public_integer_input(&mut self, values: &[u64]) -> WireId<Arithmetic> {
        self.plain.public_integer_input(values)
    }

    async fn recover_integer_wire(&mut self, shares: &[u64]) -> Result<WireId<Arithmetic>, Error> {
        let mut value = shares.to_vec();
        for agent in self.agents.values_mut() {
            let theirs = agent.exchange_u64s("plaintext recover", shares).await?;
            value
                .iter_mut()
                .zip(theirs)
                .for_each(|(v, s)| *v = v.wrapping_add(s));
        }
        Ok(self.plain.input(value, true))
    }

    async fn open_integer_to_party(
        &mut self,
        wire: WireId<Arithmetic>,
        party: usize,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.plain.open_integer_to_party(wire, party).await
    }

    async fn extract_integer_share(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        let value = self.plain.value_of(wire)?;
        Ok(self.share_of(value))
    }

    async fn integer_value(&mut self, wire: WireId<Arithmetic>) -> Result<Vec<u64>, Error> {
        self.plain.integer_value(wire).await
    }

    fn plus(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.plain.plus(left, right)
    }

    fn neg(&mut self, wire: WireId<Arithmetic>) -> Result<WireId<Arithmetic>, Error> {
        self.plain.neg(wire)
    }

    async fn mult(
        &mut self,
        left: WireId<Arithmetic>,
        right: WireId<Arithmetic>,
    ) -> Result<WireId<Arithmetic>, Error> {
        self.plain.mult(left, right).await
    }

    fn batching_integer(
        &mut self,
        wires: &[WireId<Arithmetic>],
    ) -> Result<WireId<Arithmetic>, Error> {
        self.plain.batching_integer(wires)
    }

    fn unbatching_integer(
        &mut self,
        wire: WireId<Arithmetic>,
        sizes: &[usize],
    ) -> Result<Vec<WireId<Arithmetic>>, Error> {
        self.plain.unbatching_integer(wire, sizes)
    }

    fn release_boolean(&mut self, wire: WireId<Boolean>) -> Result<(), Error> {
        self.plain.release_boolean(wire)
    }

    fn release_integer(&mut self, wire: WireId<Arithmetic>) -> Result<(), Error> {
        self.plain.release_integer(wire)
    }

    fn boolean_lanes(&self, wire: WireId<Boolean>) -> Result<usize, Error> {
        self.plain.boolean_lanes(wire)
    }

    fn integer_lanes(&self, wire: WireId<Arithmetic>) -> Result<usize, Error> {
        self.plain.integer_lanes(wire)
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn traffic_statistics(&self) -> TrafficStats {
        self.agents
            .values()
            .fold(TrafficStats::default(), |acc, a| acc + a.traffic_statistics())
    }

    fn gate_statistics(&self) -> GateStats {
        self.plain.gate_statistics()
    }

    fn wire_statistics(&self) -> WireStats {
        self.plain.wire_statistics()
    }
}

#[cfg(test)]
mod tests {
    use futures::future::try_join_all;

    use super::*;
    use crate::{agent::InMemoryAgentFactory, config::SchedulerKind};

    #[tokio::test]
    async fn inputs_travel_in_the_clear() {
        let config = MpcConfig {
            num_parties: 3,
            scheduler: SchedulerKind::NetworkPlaintext,
            ..Default::default()
        };
        let factories = InMemoryAgentFactory::network(3);
        let results = try_join_all(factories.into_iter().enumerate().map(|(p, mut f)| {
            let config = config.for_party(p);
            async move {
                let mut scheduler = NetworkPlaintextScheduler::create(&config, &mut f).await?;
                let mine = [p as u64 * 10, 1];
                let mut sum = scheduler.private_integer_input(0, &mine).await?;
                for owner in 1..3 {
                    let input = scheduler.private_integer_input(owner, &mine).await?;
                    sum = scheduler.plus(sum, input)?;
                }
                let share = scheduler.extract_integer_share(sum).await?;
                let recovered = scheduler.recover_integer_wire(&share).await?;
                let doubled = scheduler.plus(recovered, sum)?;
                let opened = scheduler.open_integer_to_party(doubled, 2).await?;
                let value = scheduler.integer_value(opened).await?;
                Ok::<_, Error>((share, value, scheduler.traffic_statistics()))
            }
        }))
        .await
        .unwrap();
        assert_eq!(results[0].0, vec![30, 3]);
        assert_eq!(results[1].0, vec![0, 0]);
        assert_eq!(results[0].1, vec![0, 0]);
        assert_eq!(results[2].1, vec![60, 6]);
        assert_eq!(results[0].2.sent, 2 * 16 + 2 * 16);
    }
}
