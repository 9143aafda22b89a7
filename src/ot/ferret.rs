//! FERRET random correlated OT extension (cf. <https://eprint.iacr.org/2020/924>),
//! semi-honest variant.
//!
//! One extension round turns `base_size + weight * depth` RCOTs into
//! `extended_size` RCOTs: the first `base_size` base RCOTs are multiplied with
//! a sparse random matrix and XORed with the output of a regular multi point
//! COT built from the remaining base RCOTs. The last outputs of each round are
//! kept as the base of the next one, the very first base comes from IKNP.
use tracing::{Level, debug, instrument};

use crate::{
    agent::CommunicationAgent,
    block::Block,
    channel::Channel,
    config::OtConfig,
    crypto::Prg,
    ot::{Error, IknpReceiver, IknpSender, RandomCorrelatedOt},
};

mod matrix;
mod mpcot;
mod spcot;

use matrix::TenLocalMatrix;
use mpcot::RegularErrorMultiPointCot;

/// Validated FERRET parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FerretParams {
    base_size: usize,
    weight: usize,
    depth: usize,
}

impl FerretParams {
    pub(crate) fn new(config: &OtConfig) -> Result<Self, Error> {
        let OtConfig {
            extended_size,
            base_size,
            weight,
            ..
        } = *config;
        if weight == 0 || base_size == 0 {
            return Err(Error::InvalidParameters(
                "FERRET weight and base size must be positive".to_string(),
            ));
        }
        if extended_size % weight != 0 {
            return Err(Error::InvalidParameters(format!(
                "FERRET weight {weight} does not divide the extended size {extended_size}"
            )));
        }
        let bin_size = extended_size / weight;
        if bin_size < 2 || !bin_size.is_power_of_two() {
            return Err(Error::InvalidParameters(format!(
                "FERRET bin size {bin_size} is not a power of two"
            )));
        }
        let params = Self {
            base_size,
            weight,
            depth: bin_size.trailing_zeros() as usize,
        };
        if params.reserved() >= extended_size {
            return Err(Error::InvalidParameters(format!(
                "FERRET rounds of {extended_size} RCOTs cannot hold the {} RCOTs of the next base",
                params.reserved()
            )));
        }
        Ok(params)
    }

    /// RCOTs consumed by one extension round.
    fn reserved(&self) -> usize {
        self.base_size + self.weight * self.depth
    }
}

/// Runs one extension round from the given base.
struct RcotExtender {
    params: FerretParams,
    mpcot: RegularErrorMultiPointCot,
}

impl RcotExtender {
    fn new(params: FerretParams) -> Self {
        Self {
            params,
            mpcot: RegularErrorMultiPointCot::new(params.weight, params.depth),
        }
    }

    async fn send<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        delta: Block,
        base: &[Block],
    ) -> Result<Vec<Block>, Error> {
        let seed = agent.recv_blocks("FERRET matrix seed", 1).await?[0];
        let (lpn_base, mpcot_base) = base.split_at(self.params.base_size);
        let mut out = self.mpcot.send(agent, delta, mpcot_base).await?;
        TenLocalMatrix::new(seed).multiply_into(lpn_base, &mut out);
        Ok(out)
    }

    async fn receive<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        base: &[Block],
    ) -> Result<Vec<Block>, Error> {
        let seed = Prg::from_entropy().random_block();
        agent.send_blocks("FERRET matrix seed", &[seed]).await?;
        let (lpn_base, mpcot_base) = base.split_at(self.params.base_size);
        let mut out = self.mpcot.receive(agent, mpcot_base).await?;
        TenLocalMatrix::new(seed).multiply_into(lpn_base, &mut out);
        Ok(out)
    }
}

/// Splits a round's output into usable RCOTs and the next base.
fn split_round(mut out: Vec<Block>, reserved: usize) -> (Vec<Block>, Vec<Block>) {
    let base = out.split_off(out.len() - reserved);
    (out, base)
}

/// FERRET RCOT sender.
pub(crate) struct FerretSender {
    params: FerretParams,
    bootstrap: IknpSender,
    extender: RcotExtender,
    base: Vec<Block>,
    buffer: Vec<Block>,
}

impl FerretSender {
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(crate) async fn setup<C: Channel>(
        config: &OtConfig,
        agent: &mut CommunicationAgent<C>,
    ) -> Result<Self, Error> {
        let params = FerretParams::new(config)?;
        let bootstrap = IknpSender::setup(agent).await?;
        Ok(Self {
            params,
            bootstrap,
            extender: RcotExtender::new(params),
            base: vec![],
            buffer: vec![],
        })
    }

    pub(crate) fn delta(&self) -> Block {
        self.bootstrap.delta()
    }
}

impl RandomCorrelatedOt for FerretSender {
    #[instrument(level = Level::DEBUG, skip_all, fields(size = size), err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        while self.buffer.len() < size {
            if self.base.is_empty() {
                self.base = self.bootstrap.rcot(agent, self.params.reserved()).await?;
            }
            let delta = self.delta();
            let out = self.extender.send(agent, delta, &self.base).await?;
            let (usable, base) = split_round(out, self.params.reserved());
            self.base = base;
            self.buffer.extend(usable);
            debug!(buffered = self.buffer.len(), "FERRET sender round");
        }
        Ok(self.buffer.drain(..size).collect())
    }
}

/// FERRET RCOT receiver.
pub(crate) struct FerretReceiver {
    params: FerretParams,
    bootstrap: IknpReceiver,
    extender: RcotExtender,
    base: Vec<Block>,
    buffer: Vec<Block>,
}

impl FerretReceiver {
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(crate) async fn setup<C: Channel>(
        config: &OtConfig,
        agent: &mut CommunicationAgent<C>,
    ) -> Result<Self, Error> {
        let params = FerretParams::new(config)?;
        let bootstrap = IknpReceiver::setup(agent).await?;
        Ok(Self {
            params,
            bootstrap,
            extender: RcotExtender::new(params),
            base: vec![],
            buffer: vec![],
        })
    }
}

impl RandomCorrelatedOt for FerretReceiver {
    #[instrument(level = Level::DEBUG, skip_all, fields(size = size), err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        while self.buffer.len() < size {
            if self.base.is_empty() {
                self.base = self.bootstrap.rcot(agent, self.params.reserved()).await?;
            }
            let out = self.extender.receive(agent, &self.base).await?;
            let (usable, base) = split_round(out, self.params.reserved());
            self.base = base;
            self.buffer.extend(usable);
            debug!(buffered = self.buffer.len(), "FERRET receiver round");
        }
        Ok(self.buffer.drain(..size).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtProtocol;

    fn config(extended_size: usize, base_size: usize, weight: usize) -> OtConfig {
        OtConfig {
            protocol: OtProtocol::Ferret,
            extended_size,
            base_size,
            weight,
        }
    }

    #[test]
    fn default_parameters_are_valid() {
        let params = FerretParams::new(&OtConfig::default()).unwrap();
        assert_eq!(13, params.depth);
        let params = FerretParams::new(&OtConfig::for_tests()).unwrap();
        assert_eq!(10, params.depth);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        // weight does not divide the size
        assert!(FerretParams::new(&config(1000, 100, 3)).is_err());
        // bins are not a power of two
        assert!(FerretParams::new(&config(96, 10, 32)).is_err());
        // the next base does not fit
        assert!(FerretParams::new(&config(1024, 1000, 4)).is_err());
        assert!(FerretParams::new(&config(1024, 100, 0)).is_err());
    }
}
