//! Log output for the command-line binary.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the embedding application, or to [`init_tracing`] for the CLI.

mod tracing_init;

pub use tracing_init::*;
