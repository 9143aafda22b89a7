//! Configuration of an MPC party.
//!
//! All parties of a computation must use the same configuration except for
//! `party_id`.
use serde::{Deserialize, Serialize};

use crate::{Error, ot::FerretParams};

/// Which scheduler evaluates the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Evaluates every gate as soon as it is created.
    Eager,
    /// Records gates and evaluates them level by level when a value is needed.
    #[default]
    Lazy,
    /// Computes on plaintext values without any communication. Insecure.
    Plaintext,
    /// Sends private inputs to all parties and computes on plaintext. Insecure.
    NetworkPlaintext,
}

/// Where the Beaver tuples for AND and MULT gates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TupleGeneratorKind {
    /// No tuples at all, for circuits without non-free gates.
    Null,
    /// Locally sampled tuples that party 0 knows in full. Insecure.
    Dummy,
    /// Tuples generated with oblivious transfer.
    #[default]
    Secure,
}

/// The random correlated OT protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtProtocol {
    /// LPN based silent OT extension.
    #[default]
    Ferret,
    /// IKNP OT extension.
    Classic,
    /// Keys are sent in the clear. Insecure.
    Dummy,
}

/// OT protocol selection and FERRET parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtConfig {
    /// The protocol used for random correlated OTs.
    pub protocol: OtProtocol,
    /// RCOTs produced per FERRET extension round.
    pub extended_size: usize,
    /// Base RCOTs multiplied with the LPN matrix per round.
    pub base_size: usize,
    /// Punctured points per round. Must divide `extended_size` into
    /// power-of-two sized bins.
    pub weight: usize,
}

impl Default for OtConfig {
    fn default() -> Self {
        Self {
            protocol: OtProtocol::Ferret,
            extended_size: 10_805_248,
            base_size: 589_760,
            weight: 1_319,
        }
    }
}

impl OtConfig {
    /// Small FERRET parameters that keep extension rounds fast in tests.
    pub fn for_tests() -> Self {
        Self {
            protocol: OtProtocol::Ferret,
            extended_size: 32_768,
            base_size: 4_096,
            weight: 32,
        }
    }
}

/// The configuration of one party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpcConfig {
    /// Id of this party, in `0..num_parties`.
    pub party_id: usize,
    /// Number of parties of the computation.
    pub num_parties: usize,
    /// The scheduler used to evaluate gates.
    pub scheduler: SchedulerKind,
    /// The source of Beaver tuples.
    pub tuple_generator: TupleGeneratorKind,
    /// The OT used by secure tuple generators.
    pub ot: OtConfig,
    /// Boolean tuples generated per refill.
    pub boolean_buffer_size: usize,
    /// Integer tuples generated per refill.
    pub integer_buffer_size: usize,
    /// Lazy schedulers evaluate pending gates once more than this many are recorded.
    pub max_unexecuted_gates: usize,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            party_id: 0,
            num_parties: 2,
            scheduler: SchedulerKind::default(),
            tuple_generator: TupleGeneratorKind::default(),
            ot: OtConfig::default(),
            boolean_buffer_size: 1_600_000,
            integer_buffer_size: 40_000,
            max_unexecuted_gates: 100_000,
        }
    }
}

impl MpcConfig {
    /// The same configuration for another party.
    pub fn for_party(&self, party_id: usize) -> Self {
        Self {
            party_id,
            ..self.clone()
        }
    }

    /// Checks that the configuration describes a valid computation.
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_parties < 2 {
            return Err(Error::Construction(format!(
                "at least 2 parties are needed, got {}",
                self.num_parties
            )));
        }
        if self.party_id >= self.num_parties {
            return Err(Error::Construction(format!(
                "party id {} is out of range for {} parties",
                self.party_id, self.num_parties
            )));
        }
        if self.boolean_buffer_size == 0 || self.integer_buffer_size == 0 {
            return Err(Error::Construction(
                "tuple buffer sizes must be positive".to_string(),
            ));
        }
        if self.max_unexecuted_gates == 0 {
            return Err(Error::Construction(
                "max_unexecuted_gates must be positive".to_string(),
            ));
        }
        if self.tuple_generator == TupleGeneratorKind::Secure
            && self.ot.protocol == OtProtocol::Ferret
        {
            FerretParams::new(&self.ot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        MpcConfig::default().validate().unwrap();
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = MpcConfig::default();
        let cases = [
            MpcConfig {
                num_parties: 1,
                ..base.clone()
            },
            base.for_party(2),
            MpcConfig {
                boolean_buffer_size: 0,
                ..base.clone()
            },
            MpcConfig {
                ot: OtConfig {
                    weight: 3,
                    ..OtConfig::default()
                },
                ..base.clone()
            },
        ];
        for config in cases {
            assert!(matches!(config.validate(), Err(Error::Construction(_))));
        }
    }

    #[test]
    fn ferret_parameters_are_ignored_for_other_protocols() {
        let config = MpcConfig {
            ot: OtConfig {
                protocol: OtProtocol::Classic,
                weight: 3,
                ..OtConfig::default()
            },
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
