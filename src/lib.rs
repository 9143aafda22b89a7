//! Secure multi-party computation (MPC) on secret shares, with Beaver tuples generated by
//! oblivious transfer.
//!
//! Every party holds a share of every secret value. Booleans are XOR shared and integers are
//! additively shared modulo `2^64`. XOR, NOT, PLUS and NEG are computed locally, AND and MULT
//! consume one precomputed tuple per lane and one round of communication. Values are batches:
//! a single wire carries many lanes, so one circuit is evaluated on many inputs at once.
//!
//! ## Main Components
//!
//! * [`frontend`]: [`frontend::Bit`], [`frontend::Int`] and [`frontend::BitString`], typed
//!   values with adders, comparators and multiplexers built from gates.
//! * [`scheduler`]: The [`scheduler::Scheduler`] trait with eager, lazy and plaintext
//!   implementations. The lazy scheduler batches independent gates into shared rounds.
//! * [`engine`]: The [`engine::SecretShareEngine`], which shares inputs, evaluates gates on
//!   shares and opens results.
//! * [`tuple_generator`]: Sources of Beaver tuples, from insecure test generators to tuples
//!   generated with FERRET or IKNP random correlated OT.
//! * [`agent`] and [`channel`]: Communication between parties, in memory or over TCP.
//! * [`game`]: Runs a computation for one party, or for all parties in one process.
//!
//! ## Example
//!
//! ```no_run
//! use polyshare::{
//!     Error,
//!     config::{MpcConfig, TupleGeneratorKind},
//!     frontend::SignedInt,
//!     game::{Game, simulate_game},
//!     scheduler::Scheduler,
//! };
//!
//! struct Sum;
//!
//! impl Game for Sum {
//!     type Input = i64;
//!     type Output = Vec<i64>;
//!
//!     async fn play<S: Scheduler>(&self, s: &mut S, input: i64) -> Result<Vec<i64>, Error> {
//!         let a = SignedInt::<64>::private_input(s, 0, &[input]).await?;
//!         let b = SignedInt::<64>::private_input(s, 1, &[input]).await?;
//!         let sum = a.add(s, &b).await?;
//!         let opened = sum.open_to_party(s, 0).await?;
//!         opened.value(s).await
//!     }
//! }
//!
//! # async fn example() -> Result<(), Error> {
//! let config = MpcConfig {
//!     tuple_generator: TupleGeneratorKind::Secure,
//!     ..Default::default()
//! };
//! let configs = [config.for_party(0), config.for_party(1)];
//! let reports = simulate_game(&configs, &Sum, vec![20, 2000]).await?;
//! assert_eq!(reports[0].output, vec![2020]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Properties
//!
//! The protocols are secure against semi-honest adversaries that corrupt all but one party.
//! The dummy tuple generators, the dummy OT and the plaintext schedulers are insecure and only
//! meant for testing.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod agent;
pub mod channel;
pub mod config;
pub mod engine;
pub mod frontend;
pub mod game;
pub mod scheduler;
pub mod tuple_generator;

mod block;
mod crypto;
mod error;
mod ot;
mod transpose;
mod utils;

pub use error::Error;

#[cfg(feature = "__bench")]
#[doc(hidden)]
#[allow(missing_docs)]
pub mod bench_reexports;
