//! Run lifecycle: creation with a configuration snapshot, lookup, status writes,
//! cancellation, deletion and the fire-and-forget start.

use crate::compare::{compare_runs, RunComparison};
use crate::engine::{ExecuteOptions, ExecutionSummary, Executor};
use crate::errors::BenchError;
use crate::model::{
    new_id, now_rfc3339, CreateRunOptions, RagConfigSnapshot, Run, RunFilter, RunResult,
    RunStatus, RunUpdate, TokenTotals,
};
use crate::providers::defaults::DefaultsSource;
use crate::storage::{QuestionSource, RunStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A run whose execution continues on a background task.
#[derive(Debug)]
pub struct StartedRun {
    /// The run as claimed (`running`, progress 0).
    pub run: Run,
    pub handle: JoinHandle<anyhow::Result<ExecutionSummary>>,
}

#[derive(Clone)]
pub struct RunManager {
    runs: Arc<dyn RunStore>,
    questions: Arc<dyn QuestionSource>,
    defaults: Arc<dyn DefaultsSource>,
}

impl RunManager {
    pub fn new(
        runs: Arc<dyn RunStore>,
        questions: Arc<dyn QuestionSource>,
        defaults: Arc<dyn DefaultsSource>,
    ) -> Self {
        Self {
            runs,
            questions,
            defaults,
        }
    }

    /// New `pending` run with the knowledge base's current settings frozen into it.
    pub fn create(
        &self,
        knowledge_base_id: &str,
        dataset_id: &str,
        options: CreateRunOptions,
    ) -> anyhow::Result<Run> {
        let dataset = self
            .questions
            .get_dataset(dataset_id)?
            .ok_or_else(|| BenchError::DatasetNotFound(dataset_id.to_string()))?;
        if dataset.knowledge_base_id != knowledge_base_id {
            warn!(
                dataset_id,
                dataset_kb = %dataset.knowledge_base_id,
                knowledge_base_id,
                "dataset belongs to a different knowledge base"
            );
        }

        let created_at = now_rfc3339();
        let name = options
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{} {} {}", dataset.name, options.run_type, created_at));
        let run = Run {
            id: new_id(),
            dataset_id: dataset_id.to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            name,
            run_type: options.run_type,
            status: RunStatus::Pending,
            progress: 0,
            rag_config_snapshot: RagConfigSnapshot::capture(self.defaults.resolve(knowledge_base_id)),
            aggregate_metrics: None,
            error_message: None,
            created_at,
            started_at: None,
            completed_at: None,
            total_questions: 0,
            tokens: TokenTotals::default(),
            estimated_cost_usd: 0.0,
        };
        self.runs.insert_run(&run)?;
        info!(run_id = %run.id, dataset_id, knowledge_base_id, run_type = %run.run_type, "run created");
        Ok(run)
    }

    pub fn get(&self, run_id: &str) -> anyhow::Result<Option<Run>> {
        self.runs.get_run(run_id)
    }

    /// Newest first.
    pub fn list(&self, knowledge_base_id: &str, filter: &RunFilter) -> anyhow::Result<Vec<Run>> {
        self.runs.list_runs(knowledge_base_id, filter)
    }

    pub fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        update: &RunUpdate,
    ) -> anyhow::Result<Run> {
        if !self.runs.update_status(run_id, status, update)? {
            return Err(BenchError::RunNotFound(run_id.to_string()).into());
        }
        self.require(run_id)
    }

    /// Removes the run and all its results.
    pub fn delete(&self, run_id: &str) -> anyhow::Result<()> {
        if !self.runs.delete_run(run_id)? {
            return Err(BenchError::RunNotFound(run_id.to_string()).into());
        }
        info!(run_id, "run deleted");
        Ok(())
    }

    /// Marks a pending or running run `cancelled`. A running execution notices before
    /// persisting its next result.
    pub fn cancel(&self, run_id: &str) -> anyhow::Result<Run> {
        // the status can move between the read and the conditional write; retry once
        for _ in 0..2 {
            let run = self.require(run_id)?;
            if run.status.is_terminal() {
                return Err(BenchError::InvalidTransition {
                    run_id: run_id.to_string(),
                    from: run.status,
                    to: RunStatus::Cancelled,
                }
                .into());
            }
            let update = RunUpdate {
                completed_at: Some(now_rfc3339()),
                ..Default::default()
            };
            if self
                .runs
                .transition(run_id, run.status, RunStatus::Cancelled, &update)?
            {
                info!(run_id, from = %run.status, "run cancelled");
                return self.require(run_id);
            }
        }
        let run = self.require(run_id)?;
        Err(BenchError::InvalidTransition {
            run_id: run_id.to_string(),
            from: run.status,
            to: RunStatus::Cancelled,
        }
        .into())
    }

    /// Claims the run synchronously and continues execution on a spawned task.
    ///
    /// Precondition failures are returned here; execution outcomes arrive through the handle
    /// and the persisted run.
    pub fn start_run(
        &self,
        executor: &Executor,
        run_id: &str,
        opts: ExecuteOptions,
    ) -> anyhow::Result<StartedRun> {
        let claimed = executor.claim(run_id)?;
        let run = claimed.run.clone();
        let executor = executor.clone();
        let handle = tokio::spawn(async move { executor.execute_claimed(claimed, opts).await });
        Ok(StartedRun { run, handle })
    }

    /// Results in question order.
    pub fn results(&self, run_id: &str) -> anyhow::Result<Vec<RunResult>> {
        self.require(run_id)?;
        self.runs.list_results(run_id)
    }

    pub fn compare(&self, run_a: &str, run_b: &str) -> anyhow::Result<RunComparison> {
        compare_runs(self.runs.as_ref(), run_a, run_b)
    }

    fn require(&self, run_id: &str) -> anyhow::Result<Run> {
        self.runs
            .get_run(run_id)?
            .ok_or_else(|| BenchError::RunNotFound(run_id.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::Pricing;
    use crate::model::{ExecutionDefaults, NewQuestion, RunType};
    use crate::providers::defaults::ConfigDefaults;
    use crate::providers::llm::fake::FakeClient;
    use crate::providers::retrieval::fake::StaticRetriever;
    use crate::providers::retrieval::RankedItem;
    use crate::storage::Store;

    fn setup() -> (Store, RunManager) {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        let defaults = ConfigDefaults::new(ExecutionDefaults::default()).with_knowledge_base(
            "handbook",
            ExecutionDefaults {
                model: "gpt-4o".into(),
                max_results: 8,
                ..Default::default()
            },
        );
        let manager = RunManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(defaults),
        );
        (store, manager)
    }

    fn dataset(store: &Store) -> String {
        let items = vec![NewQuestion {
            question: "How many vacation days?".into(),
            expected_context_ids: vec!["c1".into()],
            ..Default::default()
        }];
        store.import_questions("handbook", "hr", &items).unwrap().0.id
    }

    fn executor(store: &Store) -> Executor {
        Executor {
            runs: Arc::new(store.clone()),
            questions: Arc::new(store.clone()),
            retriever: Arc::new(
                StaticRetriever::new().with_fallback(vec![RankedItem::new("c1", "25 days", 0.9)]),
            ),
            generator: Arc::new(FakeClient::new("gen").with_response("25 days")),
            judge: None,
            pricing: Pricing::default(),
        }
    }

    #[test]
    fn create_snapshots_knowledge_base_settings() {
        let (store, manager) = setup();
        let ds = dataset(&store);
        let run = manager
            .create("handbook", &ds, CreateRunOptions::default())
            .unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.rag_config_snapshot.settings.model, "gpt-4o");
        assert_eq!(run.rag_config_snapshot.settings.max_results, 8);
        assert!(run.name.starts_with("hr full "));
        assert_eq!(manager.get(&run.id).unwrap(), Some(run.clone()));

        let other = manager
            .create(
                "unknown-kb",
                &ds,
                CreateRunOptions {
                    name: Some("baseline".into()),
                    run_type: RunType::RetrievalOnly,
                },
            )
            .unwrap();
        assert_eq!(other.name, "baseline");
        assert_eq!(other.rag_config_snapshot.settings, ExecutionDefaults::default());
    }

    #[test]
    fn create_requires_existing_dataset() {
        let (_store, manager) = setup();
        let err = manager
            .create("handbook", "missing", CreateRunOptions::default())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BenchError>(),
            Some(&BenchError::DatasetNotFound("missing".into()))
        );
    }

    #[test]
    fn cancel_only_applies_to_live_runs() {
        let (store, manager) = setup();
        let ds = dataset(&store);
        let run = manager.create("handbook", &ds, CreateRunOptions::default()).unwrap();

        let cancelled = manager.cancel(&run.id).unwrap();
        assert_eq!(cancelled.status, RunStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        let err = manager.cancel(&run.id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::InvalidTransition {
                from: RunStatus::Cancelled,
                ..
            })
        ));
        assert!(manager.cancel("nope").is_err());
    }

    #[test]
    fn update_status_and_delete_report_missing_runs() {
        let (store, manager) = setup();
        let ds = dataset(&store);
        let run = manager.create("handbook", &ds, CreateRunOptions::default()).unwrap();

        let updated = manager
            .update_status(&run.id, RunStatus::Running, &RunUpdate::progress(10))
            .unwrap();
        assert_eq!(updated.progress, 10);
        assert!(manager
            .update_status("nope", RunStatus::Running, &RunUpdate::default())
            .is_err());

        manager.delete(&run.id).unwrap();
        assert_eq!(manager.get(&run.id).unwrap(), None);
        let err = manager.delete(&run.id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::RunNotFound(_))
        ));
        assert!(manager.results(&run.id).is_err());
    }

    #[tokio::test]
    async fn start_run_returns_immediately_and_completes_in_background() {
        let (store, manager) = setup();
        let ds = dataset(&store);
        let run = manager.create("handbook", &ds, CreateRunOptions::default()).unwrap();
        let exec = executor(&store);

        let started = manager
            .start_run(&exec, &run.id, ExecuteOptions::default())
            .unwrap();
        assert_eq!(started.run.status, RunStatus::Running);

        // the claim is already persisted, so a second start fails fast
        let err = manager
            .start_run(&exec, &run.id, ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::AlreadyRunning(_)) | Some(BenchError::AlreadyCompleted(_))
        ));

        let summary = started.handle.await.unwrap().unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(manager.results(&run.id).unwrap().len(), 1);
        let listed = manager.list("handbook", &RunFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, RunStatus::Completed);
    }
}
