use crate::model::{Run, RunResult};
use ragbench_metrics::ResultMetrics;
use crate::report::progress::{ProgressEvent, ProgressSink};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Deterministic, unit-testable progress line.
#[must_use]
pub fn format_progress_line(ev: ProgressEvent) -> String {
    format!("Question {}/{} ({}%)", ev.completed, ev.total, ev.percent)
}

/// Minimum interval between progress lines.
const PROGRESS_MIN_INTERVAL_MS: u64 = 200;

pub(crate) fn progress_step(total: usize) -> usize {
    if total <= 10 {
        1
    } else {
        std::cmp::max(1, total / 10)
    }
}

/// Throttled stderr progress. Always emits the final event.
pub fn default_progress_sink() -> ProgressSink {
    let state: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    Arc::new(move |ev: ProgressEvent| {
        if ev.total == 0 {
            return;
        }
        let step = progress_step(ev.total);
        let now = Instant::now();
        let should_emit = match state.lock() {
            Ok(mut last_emit) => {
                let emit_final = ev.completed == ev.total;
                let emit_step = ev.completed % step == 0 || ev.completed == 1;
                let interval_ok = last_emit
                    .map(|t| {
                        now.saturating_duration_since(t)
                            >= Duration::from_millis(PROGRESS_MIN_INTERVAL_MS)
                    })
                    .unwrap_or(true);
                let ok = emit_final || (emit_step && interval_ok);
                if ok {
                    *last_emit = Some(now);
                }
                ok
            }
            Err(_) => true,
        };
        if should_emit {
            eprintln!("{}", format_progress_line(ev));
        }
    })
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "-".into())
}

fn score_cells(metrics: &ResultMetrics) -> String {
    let mrr = metrics.retrieval().map(|m| m.mrr);
    let overall = metrics.generation().and_then(|g| g.overall_score);
    format!("mrr={} overall={}", fmt_opt(mrr), fmt_opt(overall))
}

/// Per-question table plus run footer, on stderr.
pub fn print_summary(run: &Run, results: &[RunResult]) {
    eprintln!();
    for r in results {
        let total = r
            .timings
            .total_ms
            .map(|d| format!("({:.1}s)", d as f64 / 1000.0))
            .unwrap_or_default();
        if let Some(err) = r.metrics.error() {
            eprintln!("❌ {:<48} ERROR {}", truncate(&r.input_question, 48), err);
            continue;
        }
        let icon = if r.generated_answer.is_some() || !run.run_type.generates_answers() {
            "✅"
        } else {
            "⚠️ "
        };
        eprintln!(
            "{} {:<48} {}  {}",
            icon,
            truncate(&r.input_question, 48),
            score_cells(&r.metrics),
            total
        );
    }

    eprintln!();
    eprintln!(
        "Run {} [{}]: status={} progress={}%",
        run.id, run.name, run.status, run.progress
    );
    if let Some(agg) = &run.aggregate_metrics {
        eprintln!(
            "Summary: {} questions, {} successful, {} failed (success_rate={:.2})",
            agg.total_questions, agg.successful_questions, agg.failed_questions, agg.success_rate
        );
        eprintln!(
            "Retrieval: precision={:.3} recall={:.3} mrr={:.3} ndcg={:.3} hit_rate={:.3}",
            agg.retrieval.context_precision,
            agg.retrieval.context_recall,
            agg.retrieval.mrr,
            agg.retrieval.ndcg,
            agg.retrieval.hit_rate
        );
        eprintln!(
            "Generation: faithfulness={:.3} answer_relevance={:.3} overall={:.3}",
            agg.generation.faithfulness, agg.generation.answer_relevance, agg.generation.overall_score
        );
    }
    eprintln!(
        "Tokens: {} (generation {} / judge {}), estimated cost ${:.4}",
        run.tokens.total(),
        run.tokens.generation_prompt + run.tokens.generation_completion,
        run.tokens.judge_prompt + run.tokens.judge_completion,
        run.estimated_cost_usd
    );
    if let Some(err) = &run.error_message {
        eprintln!("Error: {}", err);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragbench_metrics::{GenerationMetrics, RetrievalMetrics};

    #[test]
    fn progress_line_is_stable() {
        assert_eq!(
            format_progress_line(ProgressEvent::new(2, 4)),
            "Question 2/4 (50%)"
        );
    }

    #[test]
    fn step_scales_with_total() {
        assert_eq!(progress_step(5), 1);
        assert_eq!(progress_step(200), 20);
    }

    #[test]
    fn score_cells_show_unmeasured_scores_as_dash() {
        let retrieval = RetrievalMetrics::compute(&["c1", "c2"], &["c2"]);
        let retrieval_only = ResultMetrics::Scored {
            retrieval: retrieval.clone(),
            generation: None,
        };
        assert_eq!(score_cells(&retrieval_only), "mrr=0.500 overall=-");

        let judged = ResultMetrics::Scored {
            retrieval,
            generation: Some(GenerationMetrics {
                overall_score: Some(0.875),
                ..Default::default()
            }),
        };
        assert_eq!(score_cells(&judged), "mrr=0.500 overall=0.875");

        let unjudged = ResultMetrics::Scored {
            retrieval: RetrievalMetrics::default(),
            generation: Some(GenerationMetrics::default()),
        };
        assert_eq!(score_cells(&unjudged), "mrr=0.000 overall=-");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("short", 8), "short");
    }
}
