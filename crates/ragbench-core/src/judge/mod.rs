mod cost;
mod judge_internal;

pub use cost::{estimate_cost, estimate_run_cost, Pricing};
pub(crate) use judge_internal::prompt::{
    ANSWER_RELEVANCE_SYSTEM, CONTEXT_RELEVANCE_SYSTEM, FAITHFULNESS_SYSTEM, HALLUCINATION_SYSTEM,
};

use crate::providers::llm::{LlmClient, TokenUsage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct JudgeRuntimeConfig {
    pub provider: String, // "openai", "fake"
    pub model: String,
    pub max_tokens: u32,
    pub detect_hallucinations: bool,
    pub pricing: Pricing,
}

impl Default for JudgeRuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1500,
            detect_hallucinations: false,
            pricing: Pricing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim: String,
    #[serde(default)]
    pub supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaithfulnessVerdict {
    pub score: f64,
    pub claims: Vec<ClaimVerdict>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completeness {
    Complete,
    Partial,
    Incomplete,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Focused,
    Unfocused,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerRelevanceVerdict {
    pub score: f64,
    pub completeness: Completeness,
    pub focus: Focus,
    pub addresses_question: bool,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

/// Judge opinion on one retrieved chunk; `index` is its rank position (0-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkEvaluation {
    pub index: usize,
    pub relevant: bool,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRelevanceVerdict {
    pub score: f64,
    pub chunks: Vec<ChunkEvaluation>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hallucination {
    pub claim: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HallucinationVerdict {
    pub hallucination_rate: f64,
    pub hallucinations: Vec<Hallucination>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

/// Combined verdict of the three concurrent evaluators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagEvaluation {
    pub faithfulness: FaithfulnessVerdict,
    pub answer_relevance: AnswerRelevanceVerdict,
    pub context_relevance: ContextRelevanceVerdict,
    /// 0.4 faithfulness + 0.4 answer relevance + 0.2 context relevance, 3 decimals.
    pub overall_score: f64,
    pub usage: TokenUsage,
    /// Wall time of the joined calls.
    pub duration_ms: u64,
}

impl RagEvaluation {
    /// Error strings of the evaluators that degraded.
    pub fn errors(&self) -> Vec<String> {
        [
            ("faithfulness", &self.faithfulness.error),
            ("answer_relevance", &self.answer_relevance.error),
            ("context_relevance", &self.context_relevance.error),
        ]
        .into_iter()
        .filter_map(|(name, e)| e.as_ref().map(|e| format!("{}: {}", name, e)))
        .collect()
    }
}

/// Stateless qualitative evaluator. Never returns an error: failed or unparsable
/// calls yield a zeroed verdict carrying `error`.
#[derive(Clone)]
pub struct JudgeService {
    config: JudgeRuntimeConfig,
    client: Arc<dyn LlmClient>,
}

impl JudgeService {
    pub fn new(config: JudgeRuntimeConfig, client: Arc<dyn LlmClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &JudgeRuntimeConfig {
        &self.config
    }

    pub async fn faithfulness<S: AsRef<str> + Sync>(
        &self,
        answer: &str,
        context: &[S],
    ) -> FaithfulnessVerdict {
        judge_internal::run::faithfulness_impl(self, answer, context).await
    }

    pub async fn answer_relevance(&self, question: &str, answer: &str) -> AnswerRelevanceVerdict {
        judge_internal::run::answer_relevance_impl(self, question, answer).await
    }

    pub async fn context_relevance<S: AsRef<str> + Sync>(
        &self,
        question: &str,
        context: &[S],
    ) -> ContextRelevanceVerdict {
        judge_internal::run::context_relevance_impl(self, question, context).await
    }

    pub async fn hallucinations<S: AsRef<str> + Sync>(
        &self,
        answer: &str,
        context: &[S],
    ) -> HallucinationVerdict {
        judge_internal::run::hallucination_impl(self, answer, context).await
    }

    /// Runs faithfulness, answer relevance and context relevance concurrently.
    pub async fn evaluate_rag_response<S: AsRef<str> + Sync>(
        &self,
        question: &str,
        answer: &str,
        context: &[S],
    ) -> RagEvaluation {
        judge_internal::run::evaluate_rag_impl(self, question, answer, context).await
    }
}
