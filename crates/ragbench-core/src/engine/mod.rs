//! Benchmark execution: claims a pending run, pushes every active question through
//! retrieval, generation and judging, and finalizes the run with aggregate metrics.

pub mod runner;

pub use runner::{ClaimedRun, ExecuteOptions, ExecutionSummary, Executor};
