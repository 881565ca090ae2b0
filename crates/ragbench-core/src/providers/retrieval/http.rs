use super::{ExecutionContext, RetrievalOutput, Retriever};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Search endpoint speaking JSON over HTTP.
///
/// Request: `{knowledge_base_id, query, max_results, min_score, hybrid_alpha}`.
/// Response: `{items: [{id, title?, content, score}], enhanced_query?, stage_timings_ms?}`.
pub struct HttpRetriever {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRetriever {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(&self, ctx: &ExecutionContext, query: &str) -> anyhow::Result<RetrievalOutput> {
        let body = json!({
            "knowledge_base_id": ctx.knowledge_base_id,
            "query": query,
            "max_results": ctx.settings.max_results,
            "min_score": ctx.settings.retrieval_thresholds.min_score,
            "hybrid_alpha": ctx.settings.retrieval_thresholds.hybrid_alpha,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("retrieval timeout: {}", e)
                } else {
                    anyhow::anyhow!("retrieval network error: {}", e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "retrieval endpoint error (status {}): {}",
                status.as_u16(),
                error_text
            );
        }

        let mut out: RetrievalOutput = resp.json().await?;
        out.items.truncate(ctx.settings.max_results);
        Ok(out)
    }
}
