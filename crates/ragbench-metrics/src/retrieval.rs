//! Information-retrieval ranking metrics.
//!
//! `retrieved` is always a ranked list (rank 1 first); `expected` is treated as a set.

use crate::types::{PrecisionSource, RetrievalMetrics};
use std::collections::HashSet;

/// Cut-off used for NDCG when the caller does not pick one.
pub const DEFAULT_NDCG_K: usize = 10;

fn expected_set<S: AsRef<str>>(expected: &[S]) -> HashSet<&str> {
    expected.iter().map(|s| s.as_ref()).collect()
}

/// Share of retrieved items that are relevant. 0 when either side is empty.
pub fn precision<S: AsRef<str>, T: AsRef<str>>(retrieved: &[S], expected: &[T]) -> f64 {
    if retrieved.is_empty() || expected.is_empty() {
        return 0.0;
    }
    let expected = expected_set(expected);
    let hits = retrieved
        .iter()
        .filter(|id| expected.contains(id.as_ref()))
        .count();
    hits as f64 / retrieved.len() as f64
}

/// Share of relevant items that were retrieved. 0 when either side is empty.
pub fn recall<S: AsRef<str>, T: AsRef<str>>(retrieved: &[S], expected: &[T]) -> f64 {
    if retrieved.is_empty() || expected.is_empty() {
        return 0.0;
    }
    let expected = expected_set(expected);
    // distinct hits, so duplicated retrieved ids cannot push recall above 1
    let found: HashSet<&str> = retrieved
        .iter()
        .map(|id| id.as_ref())
        .filter(|id| expected.contains(id))
        .collect();
    found.len() as f64 / expected.len() as f64
}

/// Reciprocal rank of the first relevant item, 0 if none is found.
pub fn mrr<S: AsRef<str>, T: AsRef<str>>(ranked: &[S], expected: &[T]) -> f64 {
    if ranked.is_empty() || expected.is_empty() {
        return 0.0;
    }
    let expected = expected_set(expected);
    ranked
        .iter()
        .position(|id| expected.contains(id.as_ref()))
        .map(|idx| 1.0 / (idx as f64 + 1.0))
        .unwrap_or(0.0)
}

/// Binary-relevance NDCG over the top `k` ranks.
///
/// `DCG = Σ rel_i / log2(i + 1)` with 1-based rank `i`, so rank 1 is divided by
/// `log2(2) = 1`. The ideal ranking puts `min(|expected|, k)` relevant items first.
/// A relevant id only gains at its first occurrence.
pub fn ndcg_at_k<S: AsRef<str>, T: AsRef<str>>(ranked: &[S], expected: &[T], k: usize) -> f64 {
    if ranked.is_empty() || expected.is_empty() || k == 0 {
        return 0.0;
    }
    let expected_ids = expected_set(expected);
    let mut seen = HashSet::new();
    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter_map(|(idx, id)| {
            let id = id.as_ref();
            (expected_ids.contains(id) && seen.insert(id)).then(|| discount(idx + 1))
        })
        .sum();

    let ideal_hits = expected_ids.len().min(k);
    let idcg: f64 = (1..=ideal_hits).map(discount).sum();
    if idcg == 0.0 {
        return 0.0;
    }
    dcg / idcg
}

fn discount(rank: usize) -> f64 {
    1.0 / ((rank as f64) + 1.0).log2()
}

/// 1 if at least one relevant item was retrieved, else 0.
pub fn hit_rate<S: AsRef<str>, T: AsRef<str>>(retrieved: &[S], expected: &[T]) -> f64 {
    let expected = expected_set(expected);
    if retrieved.iter().any(|id| expected.contains(id.as_ref())) {
        1.0
    } else {
        0.0
    }
}

impl RetrievalMetrics {
    /// Lexical retrieval metrics for one question.
    pub fn compute<S: AsRef<str>, T: AsRef<str>>(retrieved: &[S], expected: &[T]) -> Self {
        Self {
            precision: precision(retrieved, expected),
            recall: recall(retrieved, expected),
            mrr: mrr(retrieved, expected),
            ndcg: ndcg_at_k(retrieved, expected, DEFAULT_NDCG_K),
            hit_rate: hit_rate(retrieved, expected),
            llm_context_precision: None,
            precision_source: PrecisionSource::Lexical,
            retrieved_count: retrieved.len(),
            expected_count: expected.len(),
        }
    }

    pub fn has_ground_truth(&self) -> bool {
        self.expected_count > 0
    }

    /// Fold in the judge's context-relevance score.
    ///
    /// Without expected ids the lexical precision is meaningless, so the judge score
    /// replaces it; otherwise it is kept alongside as `llm_context_precision`.
    pub fn apply_llm_context_precision(&mut self, score: f64) {
        if self.has_ground_truth() {
            self.llm_context_precision = Some(score);
        } else {
            self.precision = score;
            self.precision_source = PrecisionSource::LlmJudge;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(precision(&NONE, &["d1"]), 0.0);
        assert_eq!(precision(&["d1"], &NONE), 0.0);
        assert_eq!(recall(&NONE, &["d1"]), 0.0);
        assert_eq!(recall(&["d1"], &NONE), 0.0);
        assert_eq!(mrr(&NONE, &["d1"]), 0.0);
        assert_eq!(ndcg_at_k(&["d1"], &NONE, 10), 0.0);
        assert_eq!(hit_rate(&["d1"], &NONE), 0.0);
    }

    #[test]
    fn precision_and_recall() {
        let retrieved = ["d1", "d2", "d3", "d4"];
        let expected = ["d2", "d4", "d9"];
        assert_eq!(precision(&retrieved, &expected), 0.5);
        assert!((recall(&retrieved, &expected) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn recall_ignores_duplicate_hits() {
        assert_eq!(recall(&["d1", "d1", "d1"], &["d1", "d2"]), 0.5);
    }

    #[test]
    fn mrr_first_relevant_rank() {
        assert_eq!(mrr(&["d1", "d2", "d3"], &["d2"]), 0.5);
        assert_eq!(mrr(&["d2", "d1"], &["d2"]), 1.0);
        assert_eq!(mrr(&["d1", "d3"], &["d2"]), 0.0);
    }

    #[test]
    fn ndcg_second_rank() {
        let score = ndcg_at_k(&["d1", "d2"], &["d2"], 10);
        let expected = 1.0 / 3f64.log2();
        assert!((score - expected).abs() < 1e-9);
        assert!((score - 0.6309).abs() < 1e-4);
    }

    #[test]
    fn ndcg_perfect_ranking_is_one() {
        assert_eq!(ndcg_at_k(&["a", "b", "x"], &["a", "b"], 10), 1.0);
        assert_eq!(ndcg_at_k(&["c1"], &["c1"], 10), 1.0);
    }

    #[test]
    fn ndcg_counts_a_repeated_hit_once() {
        assert_eq!(ndcg_at_k(&["c1", "c1"], &["c1"], 10), 1.0);
        let score = ndcg_at_k(&["x", "c1", "c1"], &["c1"], 10);
        assert!((score - 1.0 / 3f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn ndcg_truncates_to_k() {
        assert_eq!(ndcg_at_k(&["x", "y", "a"], &["a"], 2), 0.0);
    }

    #[test]
    fn hit_rate_any_overlap() {
        assert_eq!(hit_rate(&["d1", "d2"], &["d5"]), 0.0);
        assert_eq!(hit_rate(&["d5", "d9"], &["d5"]), 1.0);
    }

    #[test]
    fn llm_precision_replaces_only_without_ground_truth() {
        let mut with_truth = RetrievalMetrics::compute(&["c1", "c2"], &["c1"]);
        with_truth.apply_llm_context_precision(0.9);
        assert_eq!(with_truth.precision, 0.5);
        assert_eq!(with_truth.llm_context_precision, Some(0.9));

        let mut without_truth = RetrievalMetrics::compute(&["c1", "c2"], &NONE);
        without_truth.apply_llm_context_precision(0.75);
        assert_eq!(without_truth.precision, 0.75);
        assert_eq!(without_truth.precision_source, PrecisionSource::LlmJudge);
        assert_eq!(without_truth.llm_context_precision, None);
    }

    fn ids() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("d[0-9]", 0..12)
    }

    proptest! {
        #[test]
        fn scores_stay_in_unit_interval(retrieved in ids(), expected in ids()) {
            let m = RetrievalMetrics::compute(&retrieved, &expected);
            for v in [m.precision, m.recall, m.mrr, m.ndcg, m.hit_rate] {
                prop_assert!((0.0..=1.0 + 1e-12).contains(&v), "out of range: {}", v);
            }
        }

        #[test]
        fn hit_rate_agrees_with_mrr(retrieved in ids(), expected in ids()) {
            let hit = hit_rate(&retrieved, &expected);
            let rr = mrr(&retrieved, &expected);
            prop_assert_eq!(hit > 0.0, rr > 0.0);
        }
    }
}
