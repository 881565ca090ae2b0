use super::context::AppContext;
use super::print_json;
use crate::cli::args::CompareArgs;
use crate::exit_codes;
use ragbench_metrics::{Better, MetricComparison};
use std::path::Path;

pub(crate) fn run(args: CompareArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let ctx = AppContext::open(config)?;
    let cmp = ctx.manager().compare(&args.run_a, &args.run_b)?;
    for m in &cmp.report.metrics {
        eprintln!("{}", metric_row(m));
    }
    eprintln!(
        "wins: a={} b={} ties={} winner={}",
        cmp.report.wins_a,
        cmp.report.wins_b,
        cmp.report.ties,
        side(cmp.report.winner)
    );
    print_json(&cmp)?;
    Ok(exit_codes::SUCCESS)
}

fn side(better: Better) -> &'static str {
    match better {
        Better::A => "a",
        Better::B => "b",
        Better::Tie => "tie",
    }
}

fn metric_row(m: &MetricComparison) -> String {
    format!(
        "{:<20} a={:<10.3} b={:<10.3} diff={:+.3} ({:+.1}%) better={}",
        m.metric.name(),
        m.a,
        m.b,
        m.diff,
        m.pct_change,
        side(m.better)
    )
}
