//! Benchmark engine for retrieval-augmented generation pipelines.
//!
//! A [`Run`](model::Run) freezes a knowledge base's pipeline settings, pushes every
//! active question of a dataset through retrieval, answer generation and LLM judging,
//! and stores per-question results plus run-level aggregate metrics for comparison.

pub mod compare;
pub mod config;
pub mod engine;
pub mod errors;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
pub mod runs;
pub mod storage;

pub use compare::{compare_runs, RunComparison, RunSummary};
pub use engine::{ExecuteOptions, ExecutionSummary, Executor};
pub use errors::{BenchError, ConfigError};
pub use runs::{RunManager, StartedRun};
pub use storage::Store;
