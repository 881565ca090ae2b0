use crate::types::AggregateMetrics;
use serde::{Deserialize, Serialize};

/// Metrics compared between two runs, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparedMetric {
    ContextPrecision,
    Mrr,
    Ndcg,
    HitRate,
    RetrievalLatency,
    Faithfulness,
    AnswerRelevance,
    GenerationLatency,
    SuccessRate,
    TotalLatency,
}

impl ComparedMetric {
    pub const ALL: [ComparedMetric; 10] = [
        ComparedMetric::ContextPrecision,
        ComparedMetric::Mrr,
        ComparedMetric::Ndcg,
        ComparedMetric::HitRate,
        ComparedMetric::RetrievalLatency,
        ComparedMetric::Faithfulness,
        ComparedMetric::AnswerRelevance,
        ComparedMetric::GenerationLatency,
        ComparedMetric::SuccessRate,
        ComparedMetric::TotalLatency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ContextPrecision => "context_precision",
            Self::Mrr => "mrr",
            Self::Ndcg => "ndcg",
            Self::HitRate => "hit_rate",
            Self::RetrievalLatency => "retrieval_latency",
            Self::Faithfulness => "faithfulness",
            Self::AnswerRelevance => "answer_relevance",
            Self::GenerationLatency => "generation_latency",
            Self::SuccessRate => "success_rate",
            Self::TotalLatency => "total_latency",
        }
    }

    /// Location of the value inside the serialized `AggregateMetrics`.
    pub fn path(self) -> &'static str {
        match self {
            Self::ContextPrecision => "retrieval.context_precision",
            Self::Mrr => "retrieval.mrr",
            Self::Ndcg => "retrieval.ndcg",
            Self::HitRate => "retrieval.hit_rate",
            Self::RetrievalLatency => "latency.vector_search_ms",
            Self::Faithfulness => "generation.faithfulness",
            Self::AnswerRelevance => "generation.answer_relevance",
            Self::GenerationLatency => "latency.generation_ms",
            Self::SuccessRate => "success_rate",
            Self::TotalLatency => "latency.total_ms",
        }
    }

    /// Latency metrics are lower-is-better; everything else is higher-is-better.
    pub fn lower_is_better(self) -> bool {
        self.name().contains("latency")
    }

    pub fn value(self, m: &AggregateMetrics) -> f64 {
        match self {
            Self::ContextPrecision => m.retrieval.context_precision,
            Self::Mrr => m.retrieval.mrr,
            Self::Ndcg => m.retrieval.ndcg,
            Self::HitRate => m.retrieval.hit_rate,
            Self::RetrievalLatency => m.latency.vector_search_ms,
            Self::Faithfulness => m.generation.faithfulness,
            Self::AnswerRelevance => m.generation.answer_relevance,
            Self::GenerationLatency => m.latency.generation_ms,
            Self::SuccessRate => m.success_rate,
            Self::TotalLatency => m.latency.total_ms,
        }
    }
}

/// Which side of a comparison is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Better {
    A,
    B,
    Tie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: ComparedMetric,
    pub path: String,
    pub a: f64,
    pub b: f64,
    /// `b - a`
    pub diff: f64,
    /// `diff / a * 100`, 0 when `a` is 0.
    pub pct_change: f64,
    pub better: Better,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub metrics: Vec<MetricComparison>,
    pub wins_a: usize,
    pub wins_b: usize,
    pub ties: usize,
    pub winner: Better,
}

fn judge(metric: ComparedMetric, diff: f64) -> Better {
    if diff == 0.0 {
        return Better::Tie;
    }
    let b_is_higher = diff > 0.0;
    if b_is_higher != metric.lower_is_better() {
        Better::B
    } else {
        Better::A
    }
}

/// Compare run A against run B over the fixed metric list.
pub fn compare(a: &AggregateMetrics, b: &AggregateMetrics) -> ComparisonReport {
    let metrics: Vec<MetricComparison> = ComparedMetric::ALL
        .iter()
        .map(|&metric| {
            let (va, vb) = (metric.value(a), metric.value(b));
            let diff = vb - va;
            let pct_change = if va == 0.0 { 0.0 } else { diff / va * 100.0 };
            MetricComparison {
                metric,
                path: metric.path().to_string(),
                a: va,
                b: vb,
                diff,
                pct_change,
                better: judge(metric, diff),
            }
        })
        .collect();

    let wins_a = metrics.iter().filter(|m| m.better == Better::A).count();
    let wins_b = metrics.iter().filter(|m| m.better == Better::B).count();
    let ties = metrics.len() - wins_a - wins_b;
    let winner = match wins_a.cmp(&wins_b) {
        std::cmp::Ordering::Greater => Better::A,
        std::cmp::Ordering::Less => Better::B,
        std::cmp::Ordering::Equal => Better::Tie,
    };

    ComparisonReport {
        metrics,
        wins_a,
        wins_b,
        ties,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(report: &ComparisonReport, metric: ComparedMetric) -> &MetricComparison {
        report.metrics.iter().find(|m| m.metric == metric).unwrap()
    }

    #[test]
    fn latency_lower_wins() {
        let mut a = AggregateMetrics::default();
        let mut b = AggregateMetrics::default();
        a.latency.vector_search_ms = 200.0;
        b.latency.vector_search_ms = 100.0;
        let r = compare(&a, &b);
        let m = row(&r, ComparedMetric::RetrievalLatency);
        assert_eq!(m.diff, -100.0);
        assert_eq!(m.pct_change, -50.0);
        assert_eq!(m.better, Better::B);

        let r = compare(&b, &a);
        assert_eq!(row(&r, ComparedMetric::RetrievalLatency).better, Better::A);
    }

    #[test]
    fn quality_higher_wins() {
        let mut a = AggregateMetrics::default();
        let mut b = AggregateMetrics::default();
        a.generation.faithfulness = 0.7;
        b.generation.faithfulness = 0.9;
        let r = compare(&a, &b);
        let m = row(&r, ComparedMetric::Faithfulness);
        assert_eq!(m.better, Better::B);
        assert!((m.diff - 0.2).abs() < 1e-12);
    }

    #[test]
    fn equal_values_tie_and_zero_base_has_no_pct() {
        let mut a = AggregateMetrics::default();
        let mut b = AggregateMetrics::default();
        a.retrieval.mrr = 0.5;
        b.retrieval.mrr = 0.5;
        b.retrieval.ndcg = 0.4;
        let r = compare(&a, &b);
        assert_eq!(row(&r, ComparedMetric::Mrr).better, Better::Tie);
        let ndcg = row(&r, ComparedMetric::Ndcg);
        assert_eq!(ndcg.pct_change, 0.0);
        assert_eq!(ndcg.better, Better::B);
    }

    #[test]
    fn winner_by_win_count() {
        let a = AggregateMetrics::default();
        let r = compare(&a, &a);
        assert_eq!(r.ties, ComparedMetric::ALL.len());
        assert_eq!(r.winner, Better::Tie);

        let mut b = AggregateMetrics::default();
        b.retrieval.hit_rate = 1.0;
        b.success_rate = 1.0;
        b.latency.total_ms = 50.0; // slower than a
        let r = compare(&a, &b);
        assert_eq!((r.wins_a, r.wins_b), (1, 2));
        assert_eq!(r.winner, Better::B);
    }

    #[test]
    fn better_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Better::Tie).unwrap(), "\"tie\"");
        assert_eq!(
            serde_json::to_string(&ComparedMetric::RetrievalLatency).unwrap(),
            "\"retrieval_latency\""
        );
    }
}
