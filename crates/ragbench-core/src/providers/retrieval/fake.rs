use super::{ExecutionContext, RankedItem, RetrievalOutput, Retriever};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// On-disk form of a fixture retriever.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    #[serde(default)]
    queries: HashMap<String, Vec<RankedItem>>,
    #[serde(default)]
    fallback: Vec<RankedItem>,
}

/// Fixture retriever: fixed results per query text, with an optional fallback.
///
/// Applies the context's `min_score` and `max_results` like a real search backend.
#[derive(Debug, Default, Clone)]
pub struct StaticRetriever {
    by_query: HashMap<String, Vec<RankedItem>>,
    fallback: Vec<RankedItem>,
    fail_on: Vec<String>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `queries` (query text -> ranked items) and an optional `fallback` list.
    /// YAML is a superset of JSON, so both formats parse.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read retrieval fixtures {}", path.display()))?;
        Self::parse(&raw)
            .with_context(|| format!("invalid retrieval fixtures {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let file: FixtureFile = serde_yaml::from_str(raw)?;
        Ok(Self {
            by_query: file.queries,
            fallback: file.fallback,
            fail_on: Vec::new(),
        })
    }

    pub fn with_results(mut self, query: impl Into<String>, items: Vec<RankedItem>) -> Self {
        self.by_query.insert(query.into(), items);
        self
    }

    pub fn with_fallback(mut self, items: Vec<RankedItem>) -> Self {
        self.fallback = items;
        self
    }

    /// Fail searches whose query contains `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, ctx: &ExecutionContext, query: &str) -> anyhow::Result<RetrievalOutput> {
        if self.fail_on.iter().any(|n| query.contains(n.as_str())) {
            anyhow::bail!("index unavailable for query '{}'", query);
        }
        let min_score = ctx.settings.retrieval_thresholds.min_score;
        let items = self
            .by_query
            .get(query)
            .unwrap_or(&self.fallback)
            .iter()
            .filter(|i| i.score >= min_score)
            .take(ctx.settings.max_results)
            .cloned()
            .collect();
        Ok(RetrievalOutput {
            items,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutionDefaults, RagConfigSnapshot};

    #[tokio::test]
    async fn applies_thresholds_and_limit() {
        let retriever = StaticRetriever::new().with_results(
            "q",
            vec![
                RankedItem::new("c1", "one", 0.9),
                RankedItem::new("c2", "two", 0.1),
                RankedItem::new("c3", "three", 0.8),
                RankedItem::new("c4", "four", 0.7),
            ],
        );
        let settings = ExecutionDefaults {
            max_results: 2,
            ..Default::default()
        };
        let ctx = ExecutionContext::from_snapshot("kb", &RagConfigSnapshot::capture(settings));
        let out = retriever.search(&ctx, "q").await.unwrap();
        let ids: Vec<_> = out.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let empty = retriever.search(&ctx, "unknown").await.unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn fixture_file_supplies_queries_and_fallback() {
        let retriever = StaticRetriever::parse(
            r#"
queries:
  "How many vacation days?":
    - { id: c1, title: Leave policy, content: "25 days per year", score: 0.9 }
fallback:
  - { id: c9, content: "generic handbook text", score: 0.5 }
"#,
        )
        .unwrap();
        let ctx = ExecutionContext::from_snapshot(
            "kb",
            &RagConfigSnapshot::capture(ExecutionDefaults::default()),
        );
        let hit = retriever.search(&ctx, "How many vacation days?").await.unwrap();
        assert_eq!(hit.items[0].title.as_deref(), Some("Leave policy"));
        let other = retriever.search(&ctx, "parking").await.unwrap();
        assert_eq!(other.items[0].id, "c9");

        assert!(StaticRetriever::parse("surprise: 1").is_err());
    }
}
