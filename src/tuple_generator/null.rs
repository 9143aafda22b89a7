use std::collections::BTreeMap;

use crate::{
    Error,
    agent::TrafficStats,
    tuple_generator::{
        ArithmeticTupleGenerator, BooleanTuple, BooleanTupleGenerator, CompositeBooleanTuple,
        IntegerTuple,
    },
};

/// A generator without any tuples, for circuits that only use free gates.
///
/// Requests for zero tuples succeed, every other request is an
/// [`Error::InvalidAccess`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTupleGenerator;

fn unavailable(n: usize) -> Error {
    Error::InvalidAccess(format!("{n} tuples requested from the null tuple generator"))
}

impl BooleanTupleGenerator for NullTupleGenerator {
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        match n {
            0 => Ok(vec![]),
            n => Err(unavailable(n)),
        }
    }

    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error> {
        match widths.values().sum::<usize>() {
            0 => Ok(widths.keys().map(|w| (*w, vec![])).collect()),
            n => Err(unavailable(n)),
        }
    }

    fn supports_composite(&self) -> bool {
        false
    }

    fn traffic_statistics(&self) -> TrafficStats {
        TrafficStats::default()
    }
}

impl ArithmeticTupleGenerator for NullTupleGenerator {
    async fn get_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error> {
        match n {
            0 => Ok(vec![]),
            n => Err(unavailable(n)),
        }
    }

    fn traffic_statistics(&self) -> TrafficStats {
        TrafficStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_empty_requests_succeed() {
        let mut g = NullTupleGenerator;
        assert!(g.get_boolean_tuples(0).await.unwrap().is_empty());
        assert!(g.get_integer_tuples(0).await.unwrap().is_empty());
        assert!(matches!(
            g.get_boolean_tuples(1).await,
            Err(Error::InvalidAccess(_))
        ));
        assert!(matches!(
            g.get_integer_tuples(3).await,
            Err(Error::InvalidAccess(_))
        ));
    }
}
