//! Run rows: insert, lookup, filtered listing, status writes and delete.

use crate::model::{Run, RunFilter, RunStatus, RunUpdate};
use crate::storage::rows::{RunRow, RUN_COLUMNS};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn insert_run_impl(conn: &Connection, run: &Run) -> anyhow::Result<()> {
    let aggregate_json = run
        .aggregate_metrics
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO runs(id, dataset_id, knowledge_base_id, name, run_type, status, progress,
                          config_json, aggregate_json, error_message, created_at, started_at,
                          completed_at, total_questions, tokens_json, estimated_cost_usd)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            run.id,
            run.dataset_id,
            run.knowledge_base_id,
            run.name,
            run.run_type.as_str(),
            run.status.as_str(),
            run.progress as i64,
            serde_json::to_string(&run.rag_config_snapshot)?,
            aggregate_json,
            run.error_message,
            run.created_at,
            run.started_at,
            run.completed_at,
            run.total_questions as i64,
            serde_json::to_string(&run.tokens)?,
            run.estimated_cost_usd,
        ],
    )
    .context("insert run")?;
    Ok(())
}

pub(crate) fn get_run_impl(conn: &Connection, run_id: &str) -> anyhow::Result<Option<Run>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
            params![run_id],
            RunRow::from_row,
        )
        .optional()?;
    row.map(RunRow::into_run).transpose()
}

pub(crate) fn list_runs_impl(
    conn: &Connection,
    knowledge_base_id: &str,
    filter: &RunFilter,
) -> anyhow::Result<Vec<Run>> {
    let limit = filter.limit.map(i64::from).unwrap_or(-1);
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM runs
         WHERE knowledge_base_id = ?1
           AND (?2 IS NULL OR status = ?2)
           AND (?3 IS NULL OR dataset_id = ?3)
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?4",
        RUN_COLUMNS
    ))?;
    let rows = stmt
        .query_map(
            params![
                knowledge_base_id,
                filter.status.map(|s| s.as_str()),
                filter.dataset_id,
                limit
            ],
            RunRow::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RunRow::into_run).collect()
}

/// Single-statement status write merging `update`. With `expected` set, the write only
/// applies while the stored status still equals it. Returns whether a row changed.
///
/// Aggregate metrics only survive on completed runs: any other status clears them.
pub(crate) fn write_status_impl(
    conn: &Connection,
    run_id: &str,
    status: RunStatus,
    update: &RunUpdate,
    expected: Option<RunStatus>,
) -> anyhow::Result<bool> {
    if status == RunStatus::Completed && update.aggregate_metrics.is_none() {
        anyhow::bail!(
            "run {} cannot be marked completed without aggregate metrics",
            run_id
        );
    }
    let aggregate_json = update
        .aggregate_metrics
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let tokens_json = update.tokens.as_ref().map(serde_json::to_string).transpose()?;

    let changed = conn
        .execute(
            "UPDATE runs SET
                status = ?2,
                progress = COALESCE(?3, progress),
                started_at = COALESCE(?4, started_at),
                completed_at = COALESCE(?5, completed_at),
                aggregate_json = CASE WHEN ?2 = 'completed' THEN COALESCE(?6, aggregate_json) ELSE NULL END,
                error_message = COALESCE(?7, error_message),
                total_questions = COALESCE(?8, total_questions),
                tokens_json = COALESCE(?9, tokens_json),
                estimated_cost_usd = COALESCE(?10, estimated_cost_usd)
             WHERE id = ?1 AND (?11 IS NULL OR status = ?11)",
            params![
                run_id,
                status.as_str(),
                update.progress.map(|p| p.min(100) as i64),
                update.started_at,
                update.completed_at,
                aggregate_json,
                update.error_message,
                update.total_questions.map(|n| n as i64),
                tokens_json,
                update.estimated_cost_usd,
                expected.map(|s| s.as_str()),
            ],
        )
        .context("update run status")?;
    Ok(changed == 1)
}

pub(crate) fn delete_run_impl(conn: &mut Connection, run_id: &str) -> anyhow::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM results WHERE run_id = ?1", params![run_id])?;
    let deleted = tx.execute("DELETE FROM runs WHERE id = ?1", params![run_id])?;
    tx.commit()?;
    Ok(deleted == 1)
}
