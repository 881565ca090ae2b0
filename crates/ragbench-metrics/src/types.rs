use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where `RetrievalMetrics::precision` came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionSource {
    #[default]
    Lexical,
    LlmJudge,
}

/// Ranking quality of one question's retrieval step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub precision: f64,
    pub recall: f64,
    pub mrr: f64,
    pub ndcg: f64,
    pub hit_rate: f64,
    /// Judge-rated precision, recorded next to the lexical one when ground truth exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_context_precision: Option<f64>,
    #[serde(default)]
    pub precision_source: PrecisionSource,
    pub retrieved_count: usize,
    pub expected_count: usize,
}

/// Answer quality of one question. `None` means the signal was not measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub answer_similarity: Option<f64>,
    pub context_coverage: f64,
    pub faithfulness: Option<f64>,
    pub answer_relevance: Option<f64>,
    pub context_relevance: Option<f64>,
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub judge_errors: Vec<String>,
}

/// Wall-clock timings of one question, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub vector_search_ms: Option<u64>,
    /// Sub-stage timings reported by the retrieval collaborator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub retrieval_stages_ms: BTreeMap<String, u64>,
    pub generation_ms: Option<u64>,
    pub faithfulness_ms: Option<u64>,
    pub answer_relevance_ms: Option<u64>,
    pub context_relevance_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_ms: Option<u64>,
    /// Elapsed time of the whole judging step (the three evaluators run concurrently).
    pub judge_ms: Option<u64>,
    pub total_ms: Option<u64>,
}

/// Metrics blob persisted with every result row.
///
/// A failed question serializes as `{"error": ...}`; everything else carries the
/// retrieval metrics and, when an answer was generated, the generation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultMetrics {
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<String>,
    },
    Scored {
        retrieval: RetrievalMetrics,
        #[serde(default)]
        generation: Option<GenerationMetrics>,
    },
}

impl ResultMetrics {
    pub fn failed(error: impl Into<String>, error_kind: Option<String>) -> Self {
        Self::Failed {
            error: error.into(),
            error_kind,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn retrieval(&self) -> Option<&RetrievalMetrics> {
        match self {
            Self::Scored { retrieval, .. } => Some(retrieval),
            Self::Failed { .. } => None,
        }
    }

    pub fn generation(&self) -> Option<&GenerationMetrics> {
        match self {
            Self::Scored { generation, .. } => generation.as_ref(),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Scored { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalAggregate {
    pub context_precision: f64,
    pub context_recall: f64,
    pub mrr: f64,
    pub ndcg: f64,
    pub hit_rate: f64,
    pub llm_context_precision: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationAggregate {
    pub faithfulness: f64,
    pub answer_relevance: f64,
    pub context_relevance: f64,
    pub answer_similarity: f64,
    pub context_coverage: f64,
    pub overall_score: f64,
    pub hallucination_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyAggregate {
    pub vector_search_ms: f64,
    pub generation_ms: f64,
    pub judge_ms: f64,
    pub total_ms: f64,
}

/// Run-level means. `Default` is the all-zero structure of an empty run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_questions: usize,
    pub successful_questions: usize,
    pub failed_questions: usize,
    pub success_rate: f64,
    pub retrieval: RetrievalAggregate,
    pub generation: GenerationAggregate,
    pub latency: LatencyAggregate,
}
