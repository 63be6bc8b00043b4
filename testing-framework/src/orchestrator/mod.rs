// File: testing-framework/src/orchestrator/mod.rs
//
// Orchestrator Module
//
// Time control and bounded concurrency shared by the environment, the
// transaction tracker and the built-in scenarios.

/// Clock abstractions for deterministic time control in tests
pub mod clock;
/// Bounded worker pool for concurrent node bring-up and client sequences
pub mod pool;

pub use clock::{Clock, PausedClock, SystemClock};
pub use pool::{run_bounded, try_run_bounded};
