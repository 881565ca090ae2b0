use super::context::AppContext;
use super::print_json;
use super::runner_builder::build_executor;
use crate::cli::args::{RunArgs, RunStartArgs, RunSub};
use crate::exit_codes;
use ragbench_core::errors::BenchError;
use ragbench_core::model::{CreateRunOptions, RunFilter};
use ragbench_core::report::console::{default_progress_sink, print_summary};
use ragbench_core::{ExecuteOptions, RunManager};
use serde_json::json;
use std::path::Path;

pub(crate) async fn run(args: RunArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let ctx = AppContext::open(config)?;
    let manager = ctx.manager();
    match args.cmd {
        RunSub::Create(a) => {
            let options = CreateRunOptions {
                name: a.name,
                run_type: a.run_type.into(),
            };
            print_json(&manager.create(&a.kb, &a.dataset, options)?)?;
        }
        RunSub::Start(a) => return start(&ctx, &manager, a).await,
        RunSub::Get(a) => {
            let run = manager
                .get(&a.run_id)?
                .ok_or_else(|| BenchError::RunNotFound(a.run_id.clone()))?;
            print_json(&run)?;
        }
        RunSub::List(a) => {
            let filter = RunFilter {
                status: a.status,
                dataset_id: a.dataset,
                limit: a.limit,
            };
            print_json(&manager.list(&a.kb, &filter)?)?;
        }
        RunSub::Results(a) => print_json(&manager.results(&a.run_id)?)?,
        RunSub::Cancel(a) => print_json(&manager.cancel(&a.run_id)?)?,
        RunSub::Delete(a) => {
            manager.delete(&a.run_id)?;
            print_json(&json!({ "deleted": a.run_id }))?;
        }
    }
    Ok(exit_codes::SUCCESS)
}

async fn start(ctx: &AppContext, manager: &RunManager, args: RunStartArgs) -> anyhow::Result<i32> {
    let executor = build_executor(&ctx.cfg, &ctx.store)?;
    let opts = ExecuteOptions {
        on_progress: Some(default_progress_sink()),
        parallelism: args
            .parallelism
            .unwrap_or(ctx.cfg.runner.parallelism)
            .max(1),
        cancellation_check: ctx.cfg.runner.cancellation_check,
    };

    let started = manager.start_run(&executor, &args.run_id, opts)?;
    eprintln!(
        "Running {} [{}] over {} questions",
        started.run.id, started.run.run_type, started.run.total_questions
    );
    let outcome = started
        .handle
        .await
        .map_err(|e| anyhow::anyhow!("run task aborted: {}", e))?;

    let Some(run) = manager.get(&args.run_id)? else {
        eprintln!("error: run {} disappeared during execution", args.run_id);
        return Ok(exit_codes::RUN_FAILED);
    };
    if !args.quiet {
        print_summary(&run, &manager.results(&args.run_id)?);
    }
    match outcome {
        Ok(summary) => {
            print_json(&summary)?;
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            print_json(&run)?;
            Ok(exit_codes::RUN_FAILED)
        }
    }
}
