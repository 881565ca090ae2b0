pub mod fake;
pub mod http;

use crate::model::{ExecutionDefaults, RagConfigSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline settings a run executes with. Built once per run from its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionContext {
    pub knowledge_base_id: String,
    #[serde(flatten)]
    pub settings: ExecutionDefaults,
}

impl ExecutionContext {
    pub fn from_snapshot(knowledge_base_id: &str, snapshot: &RagConfigSnapshot) -> Self {
        Self {
            knowledge_base_id: knowledge_base_id.to_string(),
            settings: snapshot.settings.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

impl RankedItem {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: content.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
    /// Ranked best first.
    #[serde(default)]
    pub items: Vec<RankedItem>,
    #[serde(default)]
    pub enhanced_query: Option<String>,
    /// Sub-stage timings reported by the collaborator (rewrite, rerank, ...).
    #[serde(default)]
    pub stage_timings_ms: BTreeMap<String, u64>,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, ctx: &ExecutionContext, query: &str) -> anyhow::Result<RetrievalOutput>;
}

impl From<RankedItem> for crate::model::RetrievedItem {
    fn from(item: RankedItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            content: item.content,
            score: item.score,
            relevant: None,
            relevance_reason: None,
        }
    }
}
