//! Per-question result rows.

use crate::model::RunResult;
use crate::storage::rows::{ResultRow, RESULT_COLUMNS};
use anyhow::Context;
use rusqlite::{params, Connection};

pub(crate) fn insert_result_impl(conn: &Connection, result: &RunResult) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO results(id, run_id, question_id, seq, input_question, enhanced_query,
                             retrieved_context_ids_json, retrieved_context_json, generated_answer,
                             timings_json, tokens_json, metrics_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            result.id,
            result.run_id,
            result.question_id,
            result.seq,
            result.input_question,
            result.enhanced_query,
            serde_json::to_string(&result.retrieved_context_ids)?,
            serde_json::to_string(&result.retrieved_context)?,
            result.generated_answer,
            serde_json::to_string(&result.timings)?,
            serde_json::to_string(&result.tokens)?,
            serde_json::to_string(&result.metrics)?,
            result.created_at,
        ],
    )
    .with_context(|| format!("insert result for question {}", result.question_id))?;
    Ok(())
}

pub(crate) fn list_results_impl(conn: &Connection, run_id: &str) -> anyhow::Result<Vec<RunResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM results WHERE run_id = ?1 ORDER BY seq ASC",
        RESULT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![run_id], ResultRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(ResultRow::into_result).collect()
}
