pub mod import;
pub mod rows;
pub mod store;
mod store_internal;

pub use store::Store;

use crate::model::{Dataset, Question, Run, RunFilter, RunResult, RunStatus, RunUpdate};

/// Read side of the dataset/question store.
pub trait QuestionSource: Send + Sync {
    /// Active questions in creation order.
    fn list_active_questions(&self, dataset_id: &str) -> anyhow::Result<Vec<Question>>;

    fn get_dataset(&self, dataset_id: &str) -> anyhow::Result<Option<Dataset>>;
}

/// Persistence of runs and their per-question results.
pub trait RunStore: Send + Sync {
    fn insert_run(&self, run: &Run) -> anyhow::Result<()>;

    fn get_run(&self, run_id: &str) -> anyhow::Result<Option<Run>>;

    /// Newest first.
    fn list_runs(&self, knowledge_base_id: &str, filter: &RunFilter) -> anyhow::Result<Vec<Run>>;

    /// Writes `status` and merges `update` in one statement. `false` when the run is unknown.
    fn update_status(&self, run_id: &str, status: RunStatus, update: &RunUpdate) -> anyhow::Result<bool>;

    /// Conditional status write: applies only while the run is still in `from`.
    fn transition(
        &self,
        run_id: &str,
        from: RunStatus,
        to: RunStatus,
        update: &RunUpdate,
    ) -> anyhow::Result<bool>;

    /// Removes the run and its results together.
    fn delete_run(&self, run_id: &str) -> anyhow::Result<bool>;

    fn insert_result(&self, result: &RunResult) -> anyhow::Result<()>;

    /// Results in question order.
    fn list_results(&self, run_id: &str) -> anyhow::Result<Vec<RunResult>>;
}
