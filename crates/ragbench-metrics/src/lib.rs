//! Metric calculator for RAG benchmark runs.
//!
//! Everything in this crate is pure: ranking metrics over retrieved vs. expected
//! context ids, cheap lexical answer-quality proxies, per-run aggregation and
//! run-to-run comparison. Callers own all I/O.

mod aggregate;
mod compare;
mod retrieval;
mod text;
mod types;

pub use aggregate::{aggregate, Sample, SuccessCriterion};
pub use compare::{compare, Better, ComparedMetric, ComparisonReport, MetricComparison};
pub use retrieval::{hit_rate, mrr, ndcg_at_k, precision, recall, DEFAULT_NDCG_K};
pub use text::{context_coverage, cosine_similarity, text_similarity};
pub use types::{
    AggregateMetrics, GenerationAggregate, GenerationMetrics, LatencyAggregate,
    PrecisionSource, ResultMetrics, RetrievalAggregate, RetrievalMetrics, StageTimings,
};
