use std::collections::VecDeque;

use crate::Error;

/// Tuples generated ahead of their use.
///
/// Every tuple is handed out once. A refill generates at least `buffer_size`
/// tuples so that small requests are amortized over one generation round.
#[derive(Debug)]
pub(crate) struct TupleBuffer<T> {
    tuples: VecDeque<T>,
    buffer_size: usize,
}

impl<T> TupleBuffer<T> {
    pub(crate) fn new(buffer_size: usize) -> Self {
        Self {
            tuples: VecDeque::new(),
            buffer_size,
        }
    }

    /// The number of tuples to generate before `n` tuples can be taken, 0 if
    /// enough tuples are buffered.
    pub(crate) fn refill_size(&self, n: usize) -> usize {
        match n.checked_sub(self.tuples.len()) {
            None | Some(0) => 0,
            Some(missing) => missing.max(self.buffer_size),
        }
    }

    pub(crate) fn refill(&mut self, tuples: Vec<T>) {
        self.tuples.extend(tuples);
    }

    /// Removes the next `n` tuples.
    pub(crate) fn take(&mut self, n: usize) -> Result<Vec<T>, Error> {
        if self.tuples.len() < n {
            return Err(Error::InvalidAccess(format!(
                "{n} tuples requested, but only {} are available",
                self.tuples.len()
            )));
        }
        Ok(self.tuples.drain(..n).collect())
    }

    pub(crate) fn len(&self) -> usize {
        self.tuples.len()
    }
}
