use crate::types::{
    AggregateMetrics, GenerationAggregate, LatencyAggregate, ResultMetrics, RetrievalAggregate,
    StageTimings,
};

/// What counts as a successful question when computing `success_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessCriterion {
    /// A non-null generated answer.
    Answer,
    /// A retrieval step without error (retrieval-only runs).
    Retrieval,
}

/// One per-question result, borrowed for aggregation.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub metrics: &'a ResultMetrics,
    pub timings: &'a StageTimings,
    pub answered: bool,
}

impl Sample<'_> {
    fn succeeded(&self, criterion: SuccessCriterion) -> bool {
        match criterion {
            SuccessCriterion::Answer => self.answered && !self.metrics.is_failed(),
            SuccessCriterion::Retrieval => !self.metrics.is_failed(),
        }
    }
}

/// Unweighted mean of the measured values; missing and non-finite values are skipped.
fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn ms(v: Option<u64>) -> Option<f64> {
    v.map(|x| x as f64)
}

/// Run-level means over per-question results. An empty slice yields all zeros.
pub fn aggregate(samples: &[Sample<'_>], criterion: SuccessCriterion) -> AggregateMetrics {
    let total = samples.len();
    if total == 0 {
        return AggregateMetrics::default();
    }

    let retrievals: Vec<_> = samples.iter().filter_map(|s| s.metrics.retrieval()).collect();
    let generations: Vec<_> = samples
        .iter()
        .filter_map(|s| s.metrics.generation())
        .collect();

    let retrieval = RetrievalAggregate {
        context_precision: mean(retrievals.iter().map(|r| Some(r.precision))),
        context_recall: mean(retrievals.iter().map(|r| Some(r.recall))),
        mrr: mean(retrievals.iter().map(|r| Some(r.mrr))),
        ndcg: mean(retrievals.iter().map(|r| Some(r.ndcg))),
        hit_rate: mean(retrievals.iter().map(|r| Some(r.hit_rate))),
        llm_context_precision: mean(retrievals.iter().map(|r| r.llm_context_precision)),
    };

    let generation = GenerationAggregate {
        faithfulness: mean(generations.iter().map(|g| g.faithfulness)),
        answer_relevance: mean(generations.iter().map(|g| g.answer_relevance)),
        context_relevance: mean(generations.iter().map(|g| g.context_relevance)),
        answer_similarity: mean(generations.iter().map(|g| g.answer_similarity)),
        context_coverage: mean(generations.iter().map(|g| Some(g.context_coverage))),
        overall_score: mean(generations.iter().map(|g| g.overall_score)),
        hallucination_rate: mean(generations.iter().map(|g| g.hallucination_rate)),
    };

    let latency = LatencyAggregate {
        vector_search_ms: mean(samples.iter().map(|s| ms(s.timings.vector_search_ms))),
        generation_ms: mean(samples.iter().map(|s| ms(s.timings.generation_ms))),
        judge_ms: mean(samples.iter().map(|s| ms(s.timings.judge_ms))),
        total_ms: mean(samples.iter().map(|s| ms(s.timings.total_ms))),
    };

    let successful = samples.iter().filter(|s| s.succeeded(criterion)).count();
    let failed = samples.iter().filter(|s| s.metrics.is_failed()).count();

    AggregateMetrics {
        total_questions: total,
        successful_questions: successful,
        failed_questions: failed,
        success_rate: successful as f64 / total as f64,
        retrieval,
        generation,
        latency,
    }
}
