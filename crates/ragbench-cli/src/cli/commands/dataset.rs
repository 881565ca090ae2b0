use super::context::AppContext;
use super::print_json;
use crate::cli::args::{DatasetArgs, DatasetImportArgs, DatasetSub};
use crate::exit_codes;
use ragbench_core::storage::import::load_question_file;
use ragbench_core::storage::QuestionSource;
use serde_json::json;
use std::path::Path;

pub(crate) fn run(args: DatasetArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let ctx = AppContext::open(config)?;
    match args.cmd {
        DatasetSub::Import(a) => import(&ctx, a),
        DatasetSub::ListQuestions(a) => {
            let questions = if a.all {
                ctx.store.list_questions(&a.dataset_id)?
            } else {
                ctx.store.list_active_questions(&a.dataset_id)?
            };
            print_json(&questions)?;
            Ok(exit_codes::SUCCESS)
        }
        DatasetSub::Deactivate(a) => {
            if !ctx.store.deactivate_question(&a.question_id)? {
                eprintln!("error: question not found: {}", a.question_id);
                return Ok(exit_codes::PRECONDITION_FAILED);
            }
            print_json(&json!({ "deactivated": a.question_id }))?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn import(ctx: &AppContext, args: DatasetImportArgs) -> anyhow::Result<i32> {
    let file = load_question_file(&args.file)?;
    if file.questions.is_empty() {
        anyhow::bail!("{} contains no questions", args.file.display());
    }
    let name = args.name.or(file.name).unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string())
    });
    let (dataset, questions) = ctx
        .store
        .import_questions(&args.kb, &name, &file.questions)?;
    tracing::info!(
        dataset_id = %dataset.id,
        questions = questions.len(),
        "dataset imported"
    );
    print_json(&json!({ "dataset": dataset, "questions": questions.len() }))?;
    Ok(exit_codes::SUCCESS)
}
