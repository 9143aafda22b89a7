//! Typed values built from scheduler gates.
//!
//! Every value is a batch: a [`Bit`] holds one bit per lane, an [`Int`] one
//! integer per lane and a [`BitString`] one fixed-length string of bits per
//! lane. The scheduler is passed to every operation, so values of several
//! schedulers can coexist in one process.
//!
//! Values are handles. Cloning a value does not copy its wires, and
//! [`Bit::release`] and friends drop the wires for every clone.
//!
//! Multiplexing comes in two flavors that compute the same result:
//! `slow_mux` runs one AND gate per bit, `fast_mux` shares a single
//! composite AND between all bits. `mux` picks `fast_mux` when the
//! `composite-mux` feature is enabled.
mod bit;
mod bit_string;
mod int;

pub use bit::Bit;
pub use bit_string::BitString;
pub use int::{Int, SignedInt, UnsignedInt};

/// Whether `mux` uses a composite AND gate.
pub const COMPOSITE_MUX: bool = cfg!(feature = "composite-mux");
