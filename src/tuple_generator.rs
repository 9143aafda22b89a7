//! Sources of Beaver tuples.
//!
//! A boolean tuple `(a, b, c)` is XOR-shared among all parties such that
//! `c = a & b`, an integer tuple is additively shared modulo `2^64` such that
//! `c = a * b`. A composite tuple shares one `a` with a vector `b` and
//! `c[i] = a & b[i]`, which lets a single opened value be ANDed with many
//! others.
//!
//! Every tuple returned by a generator is fresh and must be consumed at most once.
use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    Error,
    agent::{AgentFactory, TrafficStats},
    channel::Channel,
    config::{MpcConfig, TupleGeneratorKind},
};

mod buffer;
mod dummy;
mod multi_party;
mod null;
mod product_share;
mod two_party;

pub(crate) use buffer::TupleBuffer;
pub use dummy::DummyTupleGenerator;
pub use multi_party::{MultiPartyArithmeticTupleGenerator, MultiPartyTupleGenerator};
pub use null::NullTupleGenerator;
pub use product_share::ProductShareGenerator;
pub use two_party::TwoPartyTupleGenerator;

/// One party's share of a boolean Beaver tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BooleanTuple {
    /// Share of the first random factor.
    pub a: bool,
    /// Share of the second random factor.
    pub b: bool,
    /// Share of `a & b`.
    pub c: bool,
}

/// One party's share of a composite boolean tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositeBooleanTuple {
    /// Share of the common factor.
    pub a: bool,
    /// Shares of the second factors.
    pub b: Vec<bool>,
    /// Shares of `a & b[i]`.
    pub c: Vec<bool>,
}

/// One party's share of an integer Beaver tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegerTuple {
    /// Share of the first random factor.
    pub a: u64,
    /// Share of the second random factor.
    pub b: u64,
    /// Share of `a * b`.
    pub c: u64,
}

/// Generates boolean Beaver tuples.
#[allow(async_fn_in_trait)]
pub trait BooleanTupleGenerator {
    /// Generates `n` fresh tuples.
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error>;

    /// Generates `count` fresh composite tuples of width `width` for every
    /// entry `width -> count`.
    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error>;

    /// Whether [`BooleanTupleGenerator::get_composite_tuples`] is available.
    fn supports_composite(&self) -> bool;

    /// Traffic caused by tuple generation so far.
    fn traffic_statistics(&self) -> TrafficStats;
}

/// Generates integer Beaver tuples.
#[allow(async_fn_in_trait)]
pub trait ArithmeticTupleGenerator {
    /// Generates `n` fresh tuples.
    async fn get_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error>;

    /// Traffic caused by tuple generation so far.
    fn traffic_statistics(&self) -> TrafficStats;
}

/// The boolean tuple generators selectable by [`TupleGeneratorKind`].
pub enum AnyBooleanTupleGenerator<C: Channel> {
    /// See [`NullTupleGenerator`].
    Null(NullTupleGenerator),
    /// See [`DummyTupleGenerator`].
    Dummy(DummyTupleGenerator),
    /// See [`TwoPartyTupleGenerator`].
    TwoParty(Box<TwoPartyTupleGenerator<C>>),
    /// See [`MultiPartyTupleGenerator`].
    MultiParty(MultiPartyTupleGenerator<C>),
}

impl<C: Channel> BooleanTupleGenerator for AnyBooleanTupleGenerator<C> {
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        match self {
            Self::Null(g) => g.get_boolean_tuples(n).await,
            Self::Dummy(g) => g.get_boolean_tuples(n).await,
            Self::TwoParty(g) => g.get_boolean_tuples(n).await,
            Self::MultiParty(g) => g.get_boolean_tuples(n).await,
        }
    }

    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error> {
        match self {
            Self::Null(g) => g.get_composite_tuples(widths).await,
            Self::Dummy(g) => g.get_composite_tuples(widths).await,
            Self::TwoParty(g) => g.get_composite_tuples(widths).await,
            Self::MultiParty(g) => g.get_composite_tuples(widths).await,
        }
    }

    fn supports_composite(&self) -> bool {
        match self {
            Self::Null(g) => BooleanTupleGenerator::supports_composite(g),
            Self::Dummy(g) => BooleanTupleGenerator::supports_composite(g),
            Self::TwoParty(g) => g.supports_composite(),
            Self::MultiParty(g) => g.supports_composite(),
        }
    }

    fn traffic_statistics(&self) -> TrafficStats {
        match self {
            Self::Null(_) | Self::Dummy(_) => TrafficStats::default(),
            Self::TwoParty(g) => g.traffic_statistics(),
            Self::MultiParty(g) => g.traffic_statistics(),
        }
    }
}

/// The arithmetic tuple generators selectable by [`TupleGeneratorKind`].
pub enum AnyArithmeticTupleGenerator<C: Channel> {
    /// See [`NullTupleGenerator`].
    Null(NullTupleGenerator),
    /// See [`DummyTupleGenerator`].
    Dummy(DummyTupleGenerator),
    /// See [`MultiPartyArithmeticTupleGenerator`].
    MultiParty(MultiPartyArithmeticTupleGenerator<C>),
}

impl<C: Channel> ArithmeticTupleGenerator for AnyArithmeticTupleGenerator<C> {
    async fn get_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error> {
        match self {
            Self::Null(g) => g.get_integer_tuples(n).await,
            Self::Dummy(g) => g.get_integer_tuples(n).await,
            Self::MultiParty(g) => g.get_integer_tuples(n).await,
        }
    }

    fn traffic_statistics(&self) -> TrafficStats {
        match self {
            Self::Null(_) | Self::Dummy(_) => TrafficStats::default(),
            Self::MultiParty(g) => g.traffic_statistics(),
        }
    }
}

/// Creates the boolean tuple generator selected by `config`.
///
/// Secure generation uses the two-party protocol for exactly two parties and
/// pairwise product shares otherwise.
pub async fn create_boolean_tuple_generator<F: AgentFactory>(
    config: &MpcConfig,
    factory: &mut F,
) -> Result<AnyBooleanTupleGenerator<F::Channel>, Error> {
    let generator = match config.tuple_generator {
        TupleGeneratorKind::Null => AnyBooleanTupleGenerator::Null(NullTupleGenerator),
        TupleGeneratorKind::Dummy => {
            AnyBooleanTupleGenerator::Dummy(DummyTupleGenerator::new(config.party_id))
        }
        TupleGeneratorKind::Secure if config.num_parties == 2 => {
            let peer = 1 - config.party_id;
            AnyBooleanTupleGenerator::TwoParty(Box::new(
                TwoPartyTupleGenerator::create(&config.ot, factory, peer).await?,
            ))
        }
        TupleGeneratorKind::Secure => AnyBooleanTupleGenerator::MultiParty(
            MultiPartyTupleGenerator::create(config, factory).await?,
        ),
    };
    debug!(kind = ?config.tuple_generator, "boolean tuple generator created");
    Ok(generator)
}

/// Creates the arithmetic tuple generator selected by `config`.
pub async fn create_arithmetic_tuple_generator<F: AgentFactory>(
    config: &MpcConfig,
    factory: &mut F,
) -> Result<AnyArithmeticTupleGenerator<F::Channel>, Error> {
    let generator = match config.tuple_generator {
        TupleGeneratorKind::Null => AnyArithmeticTupleGenerator::Null(NullTupleGenerator),
        TupleGeneratorKind::Dummy => {
            AnyArithmeticTupleGenerator::Dummy(DummyTupleGenerator::new(config.party_id))
        }
        TupleGeneratorKind::Secure => AnyArithmeticTupleGenerator::MultiParty(
            MultiPartyArithmeticTupleGenerator::create(config, factory).await?,
        ),
    };
    debug!(kind = ?config.tuple_generator, "arithmetic tuple generator created");
    Ok(generator)
}
