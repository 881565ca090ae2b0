//! Lexical answer-quality proxies used when no embedder is wired in.

use std::collections::HashSet;

fn words(text: &str, min_len: usize) -> HashSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > min_len)
        .collect()
}

/// Jaccard similarity over lowercase words longer than 2 characters.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let wa = words(a, 2);
    let wb = words(b, 2);
    let union = wa.union(&wb).count();
    if union == 0 {
        return 0.0;
    }
    wa.intersection(&wb).count() as f64 / union as f64
}

/// Cosine similarity of two embeddings; 0 on length mismatch or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Fraction of distinct context words (longer than 3 chars) that the answer reuses.
pub fn context_coverage<S: AsRef<str>>(answer: &str, context: &[S]) -> f64 {
    let joined = context
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    let context_words = words(&joined, 3);
    if context_words.is_empty() {
        return 0.0;
    }
    let answer_words = words(answer, 0);
    let covered = context_words
        .iter()
        .filter(|w| answer_words.contains(*w))
        .count();
    covered as f64 / context_words.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_on_long_words() {
        // short words ("is", "a") are ignored
        let s = text_similarity("Paris is the capital", "the capital is Paris");
        assert_eq!(s, 1.0);
        let s = text_similarity("red apple", "green apple");
        assert!((s - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(text_similarity("", ""), 0.0);
        assert_eq!(text_similarity("an ox", "is it"), 0.0);
    }

    #[test]
    fn similarity_is_case_insensitive() {
        assert_eq!(text_similarity("Revenue GREW", "revenue grew"), 1.0);
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn coverage_counts_context_words() {
        let ctx = ["quarterly revenue increased", "margin stable"];
        // context words > 3 chars: quarterly, revenue, increased, margin, stable
        let cov = context_coverage("Revenue increased this quarter", &ctx);
        assert!((cov - 2.0 / 5.0).abs() < 1e-12);
        assert_eq!(context_coverage("anything", &Vec::<String>::new()), 0.0);
    }
}
