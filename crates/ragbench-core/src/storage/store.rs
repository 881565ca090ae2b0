use super::store_internal::{questions, results, runs, schema};
use super::{QuestionSource, RunStore};
use crate::model::{
    new_id, now_rfc3339, Dataset, NewQuestion, Question, Run, RunFilter, RunResult, RunStatus,
    RunUpdate,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite-backed store for datasets, runs and results.
#[derive(Clone)]
pub struct Store {
    pub(super) conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        schema::init_connection_impl(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store (tests, dry runs).
    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_connection_impl(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        schema::init_schema_impl(&conn)
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store connection mutex poisoned"))
    }

    pub fn create_dataset(&self, knowledge_base_id: &str, name: &str) -> anyhow::Result<Dataset> {
        let dataset = Dataset {
            id: new_id(),
            knowledge_base_id: knowledge_base_id.to_string(),
            name: name.to_string(),
            created_at: now_rfc3339(),
        };
        questions::insert_dataset_impl(&*self.conn()?, &dataset)?;
        Ok(dataset)
    }

    pub fn add_question(&self, dataset_id: &str, question: &NewQuestion) -> anyhow::Result<Question> {
        let conn = self.conn()?;
        if questions::get_dataset_impl(&conn, dataset_id)?.is_none() {
            return Err(crate::errors::BenchError::DatasetNotFound(dataset_id.to_string()).into());
        }
        questions::insert_question_impl(&conn, dataset_id, question)
    }

    /// Create a dataset holding `items`, all or nothing.
    pub fn import_questions(
        &self,
        knowledge_base_id: &str,
        name: &str,
        items: &[NewQuestion],
    ) -> anyhow::Result<(Dataset, Vec<Question>)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let dataset = Dataset {
            id: new_id(),
            knowledge_base_id: knowledge_base_id.to_string(),
            name: name.to_string(),
            created_at: now_rfc3339(),
        };
        questions::insert_dataset_impl(&tx, &dataset)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if item.question.trim().is_empty() {
                anyhow::bail!("question #{} has empty text", out.len() + 1);
            }
            out.push(questions::insert_question_impl(&tx, &dataset.id, item)?);
        }
        tx.commit()?;
        Ok((dataset, out))
    }

    /// All questions of a dataset, soft-deleted ones included.
    pub fn list_questions(&self, dataset_id: &str) -> anyhow::Result<Vec<Question>> {
        questions::list_questions_impl(&*self.conn()?, dataset_id, false)
    }

    pub fn deactivate_question(&self, question_id: &str) -> anyhow::Result<bool> {
        questions::deactivate_question_impl(&*self.conn()?, question_id)
    }
}

impl QuestionSource for Store {
    fn list_active_questions(&self, dataset_id: &str) -> anyhow::Result<Vec<Question>> {
        questions::list_questions_impl(&*self.conn()?, dataset_id, true)
    }

    fn get_dataset(&self, dataset_id: &str) -> anyhow::Result<Option<Dataset>> {
        questions::get_dataset_impl(&*self.conn()?, dataset_id)
    }
}

impl RunStore for Store {
    fn insert_run(&self, run: &Run) -> anyhow::Result<()> {
        runs::insert_run_impl(&*self.conn()?, run)
    }

    fn get_run(&self, run_id: &str) -> anyhow::Result<Option<Run>> {
        runs::get_run_impl(&*self.conn()?, run_id)
    }

    fn list_runs(&self, knowledge_base_id: &str, filter: &RunFilter) -> anyhow::Result<Vec<Run>> {
        runs::list_runs_impl(&*self.conn()?, knowledge_base_id, filter)
    }

    fn update_status(&self, run_id: &str, status: RunStatus, update: &RunUpdate) -> anyhow::Result<bool> {
        runs::write_status_impl(&*self.conn()?, run_id, status, update, None)
    }

    fn transition(
        &self,
        run_id: &str,
        from: RunStatus,
        to: RunStatus,
        update: &RunUpdate,
    ) -> anyhow::Result<bool> {
        runs::write_status_impl(&*self.conn()?, run_id, to, update, Some(from))
    }

    fn delete_run(&self, run_id: &str) -> anyhow::Result<bool> {
        runs::delete_run_impl(&mut *self.conn()?, run_id)
    }

    fn insert_result(&self, result: &RunResult) -> anyhow::Result<()> {
        results::insert_result_impl(&*self.conn()?, result)
    }

    fn list_results(&self, run_id: &str) -> anyhow::Result<Vec<RunResult>> {
        results::list_results_impl(&*self.conn()?, run_id)
    }
}
