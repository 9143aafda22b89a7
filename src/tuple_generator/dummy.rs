use std::collections::BTreeMap;

use crate::{
    Error,
    agent::TrafficStats,
    crypto::Prg,
    tuple_generator::{
        ArithmeticTupleGenerator, BooleanTuple, BooleanTupleGenerator, CompositeBooleanTuple,
        IntegerTuple,
    },
};

/// Insecure tuples without any communication: party 0 holds every tuple in
/// full and all other parties hold zero shares.
///
/// Only meant for testing the layers above tuple generation.
#[derive(Debug)]
pub struct DummyTupleGenerator {
    party_id: usize,
    prg: Prg,
}

impl DummyTupleGenerator {
    /// A generator for `party_id`.
    pub fn new(party_id: usize) -> Self {
        Self {
            party_id,
            prg: Prg::from_entropy(),
        }
    }
}

impl BooleanTupleGenerator for DummyTupleGenerator {
    async fn get_boolean_tuples(&mut self, n: usize) -> Result<Vec<BooleanTuple>, Error> {
        if self.party_id != 0 {
            return Ok(vec![BooleanTuple::default(); n]);
        }
        let a = self.prg.random_bits(n);
        let b = self.prg.random_bits(n);
        Ok(a.into_iter()
            .zip(b)
            .map(|(a, b)| BooleanTuple { a, b, c: a & b })
            .collect())
    }

    async fn get_composite_tuples(
        &mut self,
        widths: &BTreeMap<usize, usize>,
    ) -> Result<BTreeMap<usize, Vec<CompositeBooleanTuple>>, Error> {
        let mut tuples = BTreeMap::new();
        for (&width, &count) in widths {
            let batch = (0..count)
                .map(|_| {
                    if self.party_id != 0 {
                        return CompositeBooleanTuple {
                            a: false,
                            b: vec![false; width],
                            c: vec![false; width],
                        };
                    }
                    let a = self.prg.random_bool();
                    let b = self.prg.random_bits(width);
                    let c = b.iter().map(|b| a & b).collect();
                    CompositeBooleanTuple { a, b, c }
                })
                .collect();
            tuples.insert(width, batch);
        }
        Ok(tuples)
    }

    fn supports_composite(&self) -> bool {
        true
    }

    fn traffic_statistics(&self) -> TrafficStats {
        TrafficStats::default()
    }
}

impl ArithmeticTupleGenerator for DummyTupleGenerator {
    async fn get_integer_tuples(&mut self, n: usize) -> Result<Vec<IntegerTuple>, Error> {
        if self.party_id != 0 {
            return Ok(vec![IntegerTuple::default(); n]);
        }
        let a = self.prg.random_u64s(n);
        let b = self.prg.random_u64s(n);
        Ok(a.into_iter()
            .zip(b)
            .map(|(a, b)| IntegerTuple {
                a,
                b,
                c: a.wrapping_mul(b),
            })
            .collect())
    }

    fn traffic_statistics(&self) -> TrafficStats {
        TrafficStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple_generator::test_utils::*;

    #[tokio::test]
    async fn shares_reconstruct_to_valid_tuples() {
        let mut p0 = DummyTupleGenerator::new(0);
        let mut p1 = DummyTupleGenerator::new(1);
        let shares = vec![
            p0.get_boolean_tuples(100).await.unwrap(),
            p1.get_boolean_tuples(100).await.unwrap(),
        ];
        check_boolean_tuples(&shares);
        assert!(shares[1].iter().all(|t| *t == BooleanTuple::default()));

        let shares = vec![
            p0.get_integer_tuples(100).await.unwrap(),
            p1.get_integer_tuples(100).await.unwrap(),
        ];
        check_integer_tuples(&shares);

        let widths = BTreeMap::from([(3, 5), (64, 2)]);
        let shares = vec![
            p0.get_composite_tuples(&widths).await.unwrap(),
            p1.get_composite_tuples(&widths).await.unwrap(),
        ];
        check_composite_tuples(&shares, &widths);
    }
}
