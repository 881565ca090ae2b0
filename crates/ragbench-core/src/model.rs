use ragbench_metrics::{AggregateMetrics, ResultMetrics, StageTimings, SuccessCriterion};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    Simple,
    Complex,
    MultiHop,
    Conversational,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($ty::$variant),)+
                    other => anyhow::bail!("unknown {} '{}'", stringify!($ty), other),
                }
            }
        }
    };
}

str_enum!(QuestionType {
    Simple => "simple",
    Complex => "complex",
    MultiHop => "multi_hop",
    Conversational => "conversational",
});

str_enum!(Difficulty {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

/// A benchmark question. Soft-deleted questions (`is_active == false`) are never executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub dataset_id: String,
    pub question: String,
    pub expected_answer: Option<String>,
    pub expected_context_ids: Vec<String>,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub is_active: bool,
    pub created_at: String,
}

/// Question as written in an import file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    #[serde(default)]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub expected_context_ids: Vec<String>,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub knowledge_base_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    Full,
    RetrievalOnly,
    GenerationOnly,
}

str_enum!(RunType {
    Full => "full",
    RetrievalOnly => "retrieval_only",
    GenerationOnly => "generation_only",
});

impl RunType {
    pub fn generates_answers(self) -> bool {
        !matches!(self, RunType::RetrievalOnly)
    }

    pub fn success_criterion(self) -> SuccessCriterion {
        if self.generates_answers() {
            SuccessCriterion::Answer
        } else {
            SuccessCriterion::Retrieval
        }
    }
}

/// Run lifecycle: `pending -> running -> {completed | failed}`; `pending|running -> cancelled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

str_enum!(RunStatus {
    Pending => "pending",
    Running => "running",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalThresholds {
    pub min_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_alpha: Option<f64>,
}

impl Default for RetrievalThresholds {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            hybrid_alpha: None,
        }
    }
}

/// Pipeline settings of a knowledge base (or the system-wide fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionDefaults {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retrieval_thresholds: RetrievalThresholds,
    pub max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for ExecutionDefaults {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            retrieval_thresholds: RetrievalThresholds::default(),
            max_results: 5,
            system_prompt: None,
        }
    }
}

/// Configuration captured when a run is created; never re-read during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfigSnapshot {
    #[serde(flatten)]
    pub settings: ExecutionDefaults,
    pub captured_at: String,
}

impl RagConfigSnapshot {
    pub fn capture(settings: ExecutionDefaults) -> Self {
        Self {
            settings,
            captured_at: now_rfc3339(),
        }
    }
}

/// Token usage split between answer generation and judging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub generation_prompt: u64,
    pub generation_completion: u64,
    pub judge_prompt: u64,
    pub judge_completion: u64,
}

impl TokenTotals {
    pub fn total(&self) -> u64 {
        self.generation_prompt + self.generation_completion + self.judge_prompt + self.judge_completion
    }

    pub fn prompt(&self) -> u64 {
        self.generation_prompt + self.judge_prompt
    }

    pub fn completion(&self) -> u64 {
        self.generation_completion + self.judge_completion
    }
}

impl std::ops::AddAssign for TokenTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.generation_prompt += rhs.generation_prompt;
        self.generation_completion += rhs.generation_completion;
        self.judge_prompt += rhs.judge_prompt;
        self.judge_completion += rhs.judge_completion;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub dataset_id: String,
    pub knowledge_base_id: String,
    pub name: String,
    pub run_type: RunType,
    pub status: RunStatus,
    pub progress: u8,
    pub rag_config_snapshot: RagConfigSnapshot,
    /// Present iff `status == completed`.
    pub aggregate_metrics: Option<AggregateMetrics>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub total_questions: usize,
    pub tokens: TokenTotals,
    pub estimated_cost_usd: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRunOptions {
    pub name: Option<String>,
    pub run_type: RunType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub dataset_id: Option<String>,
    pub limit: Option<u32>,
}

/// Fields merged into a run together with a status write. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    pub progress: Option<u8>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub aggregate_metrics: Option<AggregateMetrics>,
    pub error_message: Option<String>,
    pub total_questions: Option<usize>,
    pub tokens: Option<TokenTotals>,
    pub estimated_cost_usd: Option<f64>,
}

impl RunUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            completed_at: Some(now_rfc3339()),
            ..Default::default()
        }
    }
}

/// A retrieved chunk as persisted with a result, optionally annotated by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_reason: Option<String>,
}

/// Outcome of one question within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub id: String,
    pub run_id: String,
    pub question_id: String,
    /// Position of the question within the run.
    pub seq: i64,
    pub input_question: String,
    pub enhanced_query: Option<String>,
    pub retrieved_context_ids: Vec<String>,
    pub retrieved_context: Vec<RetrievedItem>,
    /// `None` on generation failure or for retrieval-only runs.
    pub generated_answer: Option<String>,
    pub timings: StageTimings,
    pub tokens: TokenTotals,
    pub metrics: ResultMetrics,
    pub created_at: String,
}

impl RunResult {
    /// Row recorded for a question whose pipeline errored; only the error survives.
    pub fn failed(run_id: &str, question: &Question, seq: i64, metrics: ResultMetrics) -> Self {
        Self {
            id: new_id(),
            run_id: run_id.to_string(),
            question_id: question.id.clone(),
            seq,
            input_question: question.question.clone(),
            enhanced_query: None,
            retrieved_context_ids: Vec::new(),
            retrieved_context: Vec::new(),
            generated_answer: None,
            timings: StageTimings::default(),
            tokens: TokenTotals::default(),
            metrics,
            created_at: now_rfc3339(),
        }
    }

    pub fn sample(&self) -> ragbench_metrics::Sample<'_> {
        ragbench_metrics::Sample {
            metrics: &self.metrics,
            timings: &self.timings,
            answered: self.generated_answer.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_labels() {
        for s in ["pending", "running", "completed", "failed", "cancelled"] {
            assert_eq!(s.parse::<RunStatus>().unwrap().as_str(), s);
        }
        assert_eq!("multi_hop".parse::<QuestionType>().unwrap(), QuestionType::MultiHop);
        assert!("sideways".parse::<RunType>().is_err());
    }

    #[test]
    fn retrieval_only_succeeds_on_retrieval() {
        assert_eq!(
            RunType::RetrievalOnly.success_criterion(),
            SuccessCriterion::Retrieval
        );
        assert!(RunType::GenerationOnly.generates_answers());
    }

    #[test]
    fn snapshot_flattens_settings() {
        let snap = RagConfigSnapshot::capture(ExecutionDefaults::default());
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["model"], "gpt-4o-mini");
        assert!(v["captured_at"].is_string());
    }
}
