//! Schema initialization and additive migrations.

use anyhow::Context;
use rusqlite::Connection;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

pub(crate) const BUSY_TIMEOUT_MS: u64 = 5_000;

pub(crate) const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS datasets (
    id                TEXT PRIMARY KEY,
    knowledge_base_id TEXT NOT NULL,
    name              TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    seq                       INTEGER PRIMARY KEY AUTOINCREMENT,
    id                        TEXT NOT NULL UNIQUE,
    dataset_id                TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
    question                  TEXT NOT NULL,
    expected_answer           TEXT,
    expected_context_ids_json TEXT NOT NULL DEFAULT '[]',
    question_type             TEXT NOT NULL DEFAULT 'simple',
    difficulty                TEXT NOT NULL DEFAULT 'medium',
    is_active                 INTEGER NOT NULL DEFAULT 1,
    created_at                TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_questions_dataset ON questions(dataset_id, seq);

CREATE TABLE IF NOT EXISTS runs (
    id                TEXT PRIMARY KEY,
    dataset_id        TEXT NOT NULL,
    knowledge_base_id TEXT NOT NULL,
    name              TEXT NOT NULL,
    run_type          TEXT NOT NULL,
    status            TEXT NOT NULL,
    progress          INTEGER NOT NULL DEFAULT 0,
    config_json       TEXT NOT NULL,
    aggregate_json    TEXT,
    error_message     TEXT,
    created_at        TEXT NOT NULL,
    started_at        TEXT,
    completed_at      TEXT,
    total_questions   INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_runs_kb ON runs(knowledge_base_id, created_at);

CREATE TABLE IF NOT EXISTS results (
    id                         TEXT PRIMARY KEY,
    run_id                     TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    question_id                TEXT NOT NULL,
    seq                        INTEGER NOT NULL,
    input_question             TEXT NOT NULL,
    enhanced_query             TEXT,
    retrieved_context_ids_json TEXT NOT NULL,
    retrieved_context_json     TEXT NOT NULL,
    generated_answer           TEXT,
    timings_json               TEXT NOT NULL,
    metrics_json               TEXT NOT NULL,
    created_at                 TEXT NOT NULL,
    UNIQUE(run_id, question_id)
);
CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id, seq);
"#;

pub(crate) fn init_connection_impl(conn: &Connection) -> anyhow::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .context("enable foreign keys")?;
    // in-memory databases answer "memory" and stay that way
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .context("set journal_mode")?;
    debug!(journal_mode = %mode, "sqlite connection ready");
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .context("set busy_timeout")?;
    Ok(())
}

pub(crate) fn init_schema_impl(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(DDL).context("create schema")?;
    migrate_token_totals_impl(conn)?;
    Ok(())
}

/// Token/cost accounting arrived after the first schema.
pub(crate) fn migrate_token_totals_impl(conn: &Connection) -> anyhow::Result<()> {
    let cols = get_columns_impl(conn, "runs")?;
    add_column_if_missing_impl(conn, &cols, "runs", "tokens_json", "TEXT")?;
    add_column_if_missing_impl(conn, &cols, "runs", "estimated_cost_usd", "REAL")?;
    let cols = get_columns_impl(conn, "results")?;
    add_column_if_missing_impl(conn, &cols, "results", "tokens_json", "TEXT")?;
    Ok(())
}

pub(crate) fn get_columns_impl(conn: &Connection, table: &str) -> anyhow::Result<HashSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .context("prepare pragma table_info")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

pub(crate) fn add_column_if_missing_impl(
    conn: &Connection,
    cols: &HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> anyhow::Result<()> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, []).context("alter table add column")?;
    }
    Ok(())
}
