use clap::{Args, Subcommand, ValueEnum};
use ragbench_core::model::{RunStatus, RunType};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(subcommand)]
    pub cmd: RunSub,
}

#[derive(Subcommand, Debug)]
pub enum RunSub {
    /// Create a pending run, snapshotting the knowledge base's pipeline settings
    Create(RunCreateArgs),
    /// Execute a pending run (blocks; progress on stderr, summary JSON on stdout)
    Start(RunStartArgs),
    Get(RunIdArgs),
    List(RunListArgs),
    /// Per-question results in question order
    Results(RunIdArgs),
    /// Mark a pending or running run cancelled
    Cancel(RunIdArgs),
    /// Delete a run and its results
    Delete(RunIdArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunTypeArg {
    #[default]
    #[value(name = "full")]
    Full,
    #[value(name = "retrieval_only")]
    RetrievalOnly,
    #[value(name = "generation_only")]
    GenerationOnly,
}

impl From<RunTypeArg> for RunType {
    fn from(v: RunTypeArg) -> Self {
        match v {
            RunTypeArg::Full => RunType::Full,
            RunTypeArg::RetrievalOnly => RunType::RetrievalOnly,
            RunTypeArg::GenerationOnly => RunType::GenerationOnly,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunCreateArgs {
    #[arg(long)]
    pub kb: String,

    #[arg(long)]
    pub dataset: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long = "type", value_enum, default_value_t = RunTypeArg::Full)]
    pub run_type: RunTypeArg,
}

#[derive(Args, Debug)]
pub struct RunStartArgs {
    pub run_id: String,

    /// Questions in flight at once (overrides runner.parallelism)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Skip the per-question table on stderr
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct RunIdArgs {
    pub run_id: String,
}

fn parse_status(s: &str) -> Result<RunStatus, String> {
    s.parse::<RunStatus>().map_err(|e| e.to_string())
}

#[derive(Args, Debug)]
pub struct RunListArgs {
    #[arg(long)]
    pub kb: String,

    /// pending|running|completed|failed|cancelled
    #[arg(long, value_parser = parse_status)]
    pub status: Option<RunStatus>,

    #[arg(long)]
    pub dataset: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,
}
