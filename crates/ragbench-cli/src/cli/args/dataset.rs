use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub cmd: DatasetSub,
}

#[derive(Subcommand, Debug)]
pub enum DatasetSub {
    /// Import a YAML or JSON question file as a new dataset
    Import(DatasetImportArgs),
    /// List the questions of a dataset
    ListQuestions(ListQuestionsArgs),
    /// Soft-delete a question; it is skipped by future runs
    Deactivate(DeactivateArgs),
}

#[derive(Args, Debug)]
pub struct DatasetImportArgs {
    #[arg(long)]
    pub file: PathBuf,

    /// Knowledge base the questions target
    #[arg(long)]
    pub kb: String,

    /// Dataset name (default: `name` from the file, else the file stem)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListQuestionsArgs {
    pub dataset_id: String,

    /// Include deactivated questions
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct DeactivateArgs {
    pub question_id: String,
}
