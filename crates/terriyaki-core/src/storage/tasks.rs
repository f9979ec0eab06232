use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_ts, parse_opt_ts, parse_ts};
use crate::error::Result;
use crate::task::{ProblemPayload, Task};

const TASK_COLUMNS: &str = "id, user_id, grind_id, date, completed, finished_time, code, code_language,
     problem_title, problem_description, problem_url, problem_difficulty, problem_topic_tags";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let date: String = row.get(3)?;
    let problem = row_to_problem(row, 8)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        grind_id: row.get(2)?,
        date: parse_ts(3, &date)?,
        completed: row.get(4)?,
        finished_time: parse_opt_ts(5, row.get(5)?)?,
        code: row.get(6)?,
        code_language: row.get(7)?,
        problem,
    })
}

/// Reads the five problem columns starting at `base`. A missing title means
/// the task has no problem yet.
fn row_to_problem(row: &Row, base: usize) -> rusqlite::Result<Option<ProblemPayload>> {
    let Some(title) = row.get::<_, Option<String>>(base)? else {
        return Ok(None);
    };
    let tags_json: Option<String> = row.get(base + 4)?;
    let topic_tags = tags_json
        .map(|json| serde_json::from_str::<Vec<String>>(&json))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                base + 4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?
        .unwrap_or_default();
    Ok(Some(ProblemPayload {
        title,
        description: row.get::<_, Option<String>>(base + 1)?.unwrap_or_default(),
        url: row.get::<_, Option<String>>(base + 2)?.unwrap_or_default(),
        difficulty: row.get::<_, Option<String>>(base + 3)?.unwrap_or_default(),
        topic_tags,
    }))
}

/// Insert a task unless the participant already has one that day. Returns
/// `true` when a row was created.
pub fn insert_task_if_absent(conn: &Connection, task: &Task) -> Result<bool> {
    let tags = task
        .problem
        .as_ref()
        .map(|p| serde_json::to_string(&p.topic_tags))
        .transpose()?;
    let inserted = conn.execute(
        "INSERT INTO tasks (id, user_id, grind_id, date, day, completed, finished_time, code, code_language,
                            problem_title, problem_description, problem_url, problem_difficulty, problem_topic_tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(grind_id, user_id, day) DO NOTHING",
        params![
            task.id,
            task.user_id,
            task.grind_id,
            format_ts(&task.date),
            task.day(),
            task.completed,
            task.finished_time.as_ref().map(format_ts),
            task.code,
            task.code_language,
            task.problem.as_ref().map(|p| p.title.as_str()),
            task.problem.as_ref().map(|p| p.description.as_str()),
            task.problem.as_ref().map(|p| p.url.as_str()),
            task.problem.as_ref().map(|p| p.difficulty.as_str()),
            tags,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            row_to_task,
        )
        .optional()?)
}

/// Earliest task of the participant dated within `[from, to]`.
pub fn task_in_window(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Option<Task>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE user_id = ?1 AND grind_id = ?2 AND date >= ?3 AND date <= ?4
                 ORDER BY date LIMIT 1"
            ),
            params![user_id, grind_id, format_ts(from), format_ts(to)],
            row_to_task,
        )
        .optional()?)
}

pub fn tasks_for_participant(conn: &Connection, user_id: &str, grind_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND grind_id = ?2 ORDER BY date"
    ))?;
    let tasks = stmt
        .query_map(params![user_id, grind_id], row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Unfinished tasks dated at or before `cutoff`.
pub fn count_missed(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
    cutoff: &DateTime<Utc>,
) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM tasks
         WHERE user_id = ?1 AND grind_id = ?2 AND date <= ?3 AND completed = 0",
        params![user_id, grind_id, format_ts(cutoff)],
        |row| row.get(0),
    )?)
}

/// The problem already carried by some task of `grind_id` on `day`.
pub fn sibling_problem(conn: &Connection, grind_id: &str, day: &str) -> Result<Option<ProblemPayload>> {
    let problem = conn
        .query_row(
            "SELECT problem_title, problem_description, problem_url, problem_difficulty, problem_topic_tags
             FROM tasks
             WHERE grind_id = ?1 AND day = ?2 AND problem_title IS NOT NULL
             ORDER BY id LIMIT 1",
            params![grind_id, day],
            |row| row_to_problem(row, 0),
        )
        .optional()?;
    Ok(problem.flatten())
}

/// Give `problem` to every sibling on `day` that has none yet. Returns the
/// number of tasks filled.
pub fn fill_problem(
    conn: &Connection,
    grind_id: &str,
    day: &str,
    problem: &ProblemPayload,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE tasks
         SET problem_title = ?3, problem_description = ?4, problem_url = ?5,
             problem_difficulty = ?6, problem_topic_tags = ?7
         WHERE grind_id = ?1 AND day = ?2 AND problem_title IS NULL",
        params![
            grind_id,
            day,
            problem.title,
            problem.description,
            problem.url,
            problem.difficulty,
            serde_json::to_string(&problem.topic_tags)?,
        ],
    )?)
}

pub fn finish_task(
    conn: &Connection,
    id: &str,
    finished_time: &DateTime<Utc>,
    code: &str,
    code_language: &str,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE tasks SET completed = 1, finished_time = ?2, code = ?3, code_language = ?4
         WHERE id = ?1",
        params![id, format_ts(finished_time), code, code_language],
    )?)
}

pub fn delete_tasks_for_grind(conn: &Connection, grind_id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM tasks WHERE grind_id = ?1", params![grind_id])?)
}

pub fn count_tasks_for_grind(conn: &Connection, grind_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE grind_id = ?1",
        params![grind_id],
        |row| row.get(0),
    )?)
}
