use crate::errors::BenchError;
use crate::model::{RagConfigSnapshot, Run, RunStatus, RunType};
use crate::storage::RunStore;
use ragbench_metrics::{compare, AggregateMetrics, ComparisonReport};
use serde::Serialize;

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub id: String,
    pub name: String,
    pub run_type: RunType,
    pub dataset_id: String,
    pub knowledge_base_id: String,
    pub rag_config_snapshot: RagConfigSnapshot,
    pub aggregate_metrics: AggregateMetrics,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub run_a: RunSummary,
    pub run_b: RunSummary,
    #[serde(flatten)]
    pub report: ComparisonReport,
}

fn comparable(store: &dyn RunStore, run_id: &str) -> anyhow::Result<RunSummary> {
    let run: Run = store
        .get_run(run_id)?
        .ok_or_else(|| BenchError::RunNotFound(run_id.to_string()))?;
    if run.status != RunStatus::Completed {
        return Err(BenchError::NotCompleted {
            run_id: run.id,
            status: run.status,
        }
        .into());
    }
    let aggregate_metrics = run
        .aggregate_metrics
        .ok_or_else(|| BenchError::MissingAggregateMetrics(run.id.clone()))?;
    Ok(RunSummary {
        id: run.id,
        name: run.name,
        run_type: run.run_type,
        dataset_id: run.dataset_id,
        knowledge_base_id: run.knowledge_base_id,
        rag_config_snapshot: run.rag_config_snapshot,
        aggregate_metrics,
        completed_at: run.completed_at,
    })
}

/// Compares two completed runs; B is measured against A.
pub fn compare_runs(store: &dyn RunStore, run_a: &str, run_b: &str) -> anyhow::Result<RunComparison> {
    let a = comparable(store, run_a)?;
    let b = comparable(store, run_b)?;
    let report = compare(&a.aggregate_metrics, &b.aggregate_metrics);
    tracing::info!(
        run_a,
        run_b,
        wins_a = report.wins_a,
        wins_b = report.wins_b,
        ties = report.ties,
        "runs compared"
    );
    Ok(RunComparison {
        run_a: a,
        run_b: b,
        report,
    })
}
