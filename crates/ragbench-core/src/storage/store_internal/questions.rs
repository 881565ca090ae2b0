//! Datasets and their questions.

use crate::model::{new_id, now_rfc3339, Dataset, NewQuestion, Question};
use crate::storage::rows::{QuestionRow, QUESTION_COLUMNS};
use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};

pub(crate) fn insert_dataset_impl(conn: &Connection, dataset: &Dataset) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO datasets(id, knowledge_base_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            dataset.id,
            dataset.knowledge_base_id,
            dataset.name,
            dataset.created_at
        ],
    )
    .context("insert dataset")?;
    Ok(())
}

pub(crate) fn get_dataset_impl(conn: &Connection, dataset_id: &str) -> anyhow::Result<Option<Dataset>> {
    Ok(conn
        .query_row(
            "SELECT id, knowledge_base_id, name, created_at FROM datasets WHERE id = ?1",
            params![dataset_id],
            |row| {
                Ok(Dataset {
                    id: row.get(0)?,
                    knowledge_base_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?)
}

pub(crate) fn insert_question_impl(
    conn: &Connection,
    dataset_id: &str,
    q: &NewQuestion,
) -> anyhow::Result<Question> {
    let question = Question {
        id: new_id(),
        dataset_id: dataset_id.to_string(),
        question: q.question.clone(),
        expected_answer: q.expected_answer.clone(),
        expected_context_ids: q.expected_context_ids.clone(),
        question_type: q.question_type,
        difficulty: q.difficulty,
        is_active: true,
        created_at: now_rfc3339(),
    };
    conn.execute(
        "INSERT INTO questions(id, dataset_id, question, expected_answer, expected_context_ids_json,
                               question_type, difficulty, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8)",
        params![
            question.id,
            question.dataset_id,
            question.question,
            question.expected_answer,
            serde_json::to_string(&question.expected_context_ids)?,
            question.question_type.as_str(),
            question.difficulty.as_str(),
            question.created_at,
        ],
    )
    .context("insert question")?;
    Ok(question)
}

/// Questions of a dataset in insertion order.
pub(crate) fn list_questions_impl(
    conn: &Connection,
    dataset_id: &str,
    active_only: bool,
) -> anyhow::Result<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM questions
         WHERE dataset_id = ?1 AND (?2 = 0 OR is_active = 1)
         ORDER BY seq ASC",
        QUESTION_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![dataset_id, active_only], QuestionRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(QuestionRow::into_question).collect()
}

pub(crate) fn deactivate_question_impl(conn: &Connection, question_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE questions SET is_active = 0 WHERE id = ?1 AND is_active = 1",
        params![question_id],
    )?;
    Ok(n == 1)
}
