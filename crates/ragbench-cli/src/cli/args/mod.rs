use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod dataset;
pub mod run;
pub use dataset::*;
pub use run::*;

#[derive(Parser)]
#[command(
    name = "ragbench",
    version,
    about = "Benchmark retrieval-augmented generation pipelines against question datasets"
)]
pub struct Cli {
    /// Config file (default: ./ragbench.yaml when present, built-in defaults otherwise)
    #[arg(long, global = true, env = "RAGBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database schema and write a sample config if absent
    Init,
    /// Manage benchmark datasets and their questions
    Dataset(DatasetArgs),
    /// Create, execute and inspect benchmark runs
    Run(RunArgs),
    /// Compare two completed runs (B measured against A)
    Compare(CompareArgs),
}

#[derive(clap::Args, Debug)]
pub struct CompareArgs {
    pub run_a: String,
    pub run_b: String,
}
