//! Parallel compilation of independent architectures
//!
//! Every architecture is compiled from its own constant table into its own
//! output, so architectures can be spread over a thread pool freely.

mod executor;

pub use executor::{compile_parallel, ParallelConfig};
