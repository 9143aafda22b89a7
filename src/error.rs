//! The error type shared by the engine, the schedulers and the frontend.
//!
//! Every failure is fatal for the current computation: nothing in this crate
//! retries a network exchange or returns partial results.
use thiserror::Error;

use crate::{channel, ot};

/// Errors raised while setting up or evaluating a secret-shared computation.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed configuration or circuit construction, e.g. inconsistent
    /// batch sizes or a missing party.
    #[error("construction error: {0}")]
    Construction(String),
    /// The transport to another party failed or delivered malformed data.
    #[error("connection error: {0}")]
    Connection(#[from] channel::Error),
    /// A tuple source is exhausted or misconfigured, or a wire was released
    /// or never resolved.
    #[error("invalid access: {0}")]
    InvalidAccess(String),
    /// Wires or values of mismatching width or type were combined.
    #[error("runtime type error: {0}")]
    RuntimeType(String),
}

impl From<ot::Error> for Error {
    fn from(e: ot::Error) -> Self {
        match e {
            ot::Error::Channel(e) => Error::Connection(e),
            ot::Error::InvalidOtData(phase) => Error::Connection(channel::Error {
                phase,
                reason: channel::ErrorKind::InvalidData,
            }),
            ot::Error::InvalidParameters(reason) => Error::Construction(reason),
            ot::Error::InconsistentLength(reason) => Error::Construction(reason),
        }
    }
}
