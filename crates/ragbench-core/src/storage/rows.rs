use crate::model::{
    Difficulty, Question, QuestionType, RagConfigSnapshot, RetrievedItem, Run, RunResult,
    RunStatus, RunType, TokenTotals,
};
use anyhow::Context;
use ragbench_metrics::{AggregateMetrics, ResultMetrics, StageTimings};

/// Raw `runs` row; JSON columns are decoded in [`RunRow::into_run`].
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub dataset_id: String,
    pub knowledge_base_id: String,
    pub name: String,
    pub run_type: String,
    pub status: String,
    pub progress: i64,
    pub config_json: String,
    pub aggregate_json: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub total_questions: i64,
    pub tokens_json: Option<String>,
    pub estimated_cost_usd: Option<f64>,
}

pub(crate) const RUN_COLUMNS: &str = "id, dataset_id, knowledge_base_id, name, run_type, status, \
     progress, config_json, aggregate_json, error_message, created_at, started_at, completed_at, \
     total_questions, tokens_json, estimated_cost_usd";

impl RunRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            knowledge_base_id: row.get(2)?,
            name: row.get(3)?,
            run_type: row.get(4)?,
            status: row.get(5)?,
            progress: row.get(6)?,
            config_json: row.get(7)?,
            aggregate_json: row.get(8)?,
            error_message: row.get(9)?,
            created_at: row.get(10)?,
            started_at: row.get(11)?,
            completed_at: row.get(12)?,
            total_questions: row.get(13)?,
            tokens_json: row.get(14)?,
            estimated_cost_usd: row.get(15)?,
        })
    }

    pub fn into_run(self) -> anyhow::Result<Run> {
        let snapshot: RagConfigSnapshot = serde_json::from_str(&self.config_json)
            .with_context(|| format!("decode config snapshot of run {}", self.id))?;
        let aggregate_metrics: Option<AggregateMetrics> = self
            .aggregate_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .with_context(|| format!("decode aggregate metrics of run {}", self.id))?;
        let tokens: TokenTotals = decode_or_default(self.tokens_json.as_deref())
            .with_context(|| format!("decode token totals of run {}", self.id))?;

        Ok(Run {
            run_type: self.run_type.parse::<RunType>()?,
            status: self.status.parse::<RunStatus>()?,
            progress: self.progress.clamp(0, 100) as u8,
            rag_config_snapshot: snapshot,
            aggregate_metrics,
            total_questions: self.total_questions.max(0) as usize,
            tokens,
            estimated_cost_usd: self.estimated_cost_usd.unwrap_or(0.0),
            id: self.id,
            dataset_id: self.dataset_id,
            knowledge_base_id: self.knowledge_base_id,
            name: self.name,
            error_message: self.error_message,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResultRow {
    pub id: String,
    pub run_id: String,
    pub question_id: String,
    pub seq: i64,
    pub input_question: String,
    pub enhanced_query: Option<String>,
    pub retrieved_context_ids_json: String,
    pub retrieved_context_json: String,
    pub generated_answer: Option<String>,
    pub timings_json: String,
    pub tokens_json: Option<String>,
    pub metrics_json: String,
    pub created_at: String,
}

pub(crate) const RESULT_COLUMNS: &str = "id, run_id, question_id, seq, input_question, enhanced_query, \
     retrieved_context_ids_json, retrieved_context_json, generated_answer, timings_json, tokens_json, \
     metrics_json, created_at";

impl ResultRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            run_id: row.get(1)?,
            question_id: row.get(2)?,
            seq: row.get(3)?,
            input_question: row.get(4)?,
            enhanced_query: row.get(5)?,
            retrieved_context_ids_json: row.get(6)?,
            retrieved_context_json: row.get(7)?,
            generated_answer: row.get(8)?,
            timings_json: row.get(9)?,
            tokens_json: row.get(10)?,
            metrics_json: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    pub fn into_result(self) -> anyhow::Result<RunResult> {
        let ctx = || format!("decode result {}", self.id);
        let retrieved_context_ids: Vec<String> =
            serde_json::from_str(&self.retrieved_context_ids_json).with_context(ctx)?;
        let retrieved_context: Vec<RetrievedItem> =
            serde_json::from_str(&self.retrieved_context_json).with_context(ctx)?;
        let timings: StageTimings = serde_json::from_str(&self.timings_json).with_context(ctx)?;
        let tokens: TokenTotals = decode_or_default(self.tokens_json.as_deref()).with_context(ctx)?;
        let metrics: ResultMetrics = serde_json::from_str(&self.metrics_json).with_context(ctx)?;

        Ok(RunResult {
            id: self.id,
            run_id: self.run_id,
            question_id: self.question_id,
            seq: self.seq,
            input_question: self.input_question,
            enhanced_query: self.enhanced_query,
            retrieved_context_ids,
            retrieved_context,
            generated_answer: self.generated_answer,
            timings,
            tokens,
            metrics,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct QuestionRow {
    pub id: String,
    pub dataset_id: String,
    pub question: String,
    pub expected_answer: Option<String>,
    pub expected_context_ids_json: String,
    pub question_type: String,
    pub difficulty: String,
    pub is_active: bool,
    pub created_at: String,
}

pub(crate) const QUESTION_COLUMNS: &str = "id, dataset_id, question, expected_answer, \
     expected_context_ids_json, question_type, difficulty, is_active, created_at";

impl QuestionRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            question: row.get(2)?,
            expected_answer: row.get(3)?,
            expected_context_ids_json: row.get(4)?,
            question_type: row.get(5)?,
            difficulty: row.get(6)?,
            is_active: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn into_question(self) -> anyhow::Result<Question> {
        Ok(Question {
            expected_context_ids: serde_json::from_str(&self.expected_context_ids_json)
                .with_context(|| format!("decode expected context ids of question {}", self.id))?,
            question_type: self.question_type.parse::<QuestionType>()?,
            difficulty: self.difficulty.parse::<Difficulty>()?,
            id: self.id,
            dataset_id: self.dataset_id,
            question: self.question,
            expected_answer: self.expected_answer,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

/// Columns added by migration are NULL on rows written before it.
fn decode_or_default<T: serde::de::DeserializeOwned + Default>(
    raw: Option<&str>,
) -> anyhow::Result<T> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(serde_json::from_str(s)?),
        _ => Ok(T::default()),
    }
}
