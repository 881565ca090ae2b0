pub mod compare;
pub mod context;
pub mod dataset;
pub mod init;
pub mod run;
pub mod runner_builder;

use super::args::{Cli, Command};
use serde::Serialize;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config.as_deref();
    match cli.cmd {
        Command::Init => init::run(config),
        Command::Dataset(args) => dataset::run(args, config),
        Command::Run(args) => run::run(args, config).await,
        Command::Compare(args) => compare::run(args, config),
    }
}

/// Command output goes to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
