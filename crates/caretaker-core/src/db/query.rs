//! `SQLite` query helpers for the task store.
//!
//! All functions take a shared `&Connection` (a `Transaction` derefs to one)
//! and return typed structs, never raw rows. Enum columns are parsed on the
//! way out; a value the model does not know surfaces as a conversion error.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::model::log::{TaskComment, TaskUpdate};
use crate::model::session::ActorType;
use crate::model::task::{
    ChecklistItem, NewTask, ParseEnumError, PhotoPhase, Status, Task, task_number,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TASK_COLUMNS: &str = "task_id, title, description, category, priority, status, \
     due_date, estimated_hours, actual_hours, building_name, unit_number, location, \
     notes, findings, recommendations, hold_reason, progress, assigner_id, assignee_id, \
     created_at_us, updated_at_us";

// ---------------------------------------------------------------------------
// Filters and records
// ---------------------------------------------------------------------------

/// Filter criteria for task listings. Set fields combine with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assignee_id: Option<String>,
    pub assigner_id: Option<String>,
    /// Include `draft` tasks (default: false).
    pub include_drafts: bool,
}

/// Row to append to `task_updates`.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRecord<'a> {
    pub task_id: i64,
    pub actor_id: &'a str,
    pub actor_type: ActorType,
    pub status: Status,
    pub progress: Option<u8>,
    pub message: Option<&'a str>,
    pub created_at_us: i64,
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        })
    })
    .transpose()
}

fn parse_progress(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u8>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|value| {
        u8::try_from(value).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(err))
        })
    })
    .transpose()
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id: i64 = row.get(0)?;
    Ok(Task {
        id,
        task_number: task_number(id),
        title: row.get(1)?,
        description: row.get(2)?,
        category: parse_enum(row, 3)?,
        priority: parse_enum(row, 4)?,
        status: parse_enum(row, 5)?,
        due_date: parse_date(row, 6)?,
        estimated_hours: row.get(7)?,
        actual_hours: row.get(8)?,
        building_name: row.get(9)?,
        unit_number: row.get(10)?,
        location: row.get(11)?,
        notes: row.get(12)?,
        findings: row.get(13)?,
        recommendations: row.get(14)?,
        hold_reason: row.get(15)?,
        progress: parse_progress(row, 16)?.unwrap_or(0),
        before_pictures: Vec::new(),
        after_pictures: Vec::new(),
        checklist: Vec::new(),
        assigner_id: row.get(17)?,
        assignee_id: row.get(18)?,
        created_at_us: row.get(19)?,
        updated_at_us: row.get(20)?,
    })
}

fn row_to_update(row: &Row<'_>) -> rusqlite::Result<TaskUpdate> {
    Ok(TaskUpdate {
        update_id: row.get(0)?,
        task_id: row.get(1)?,
        actor_id: row.get(2)?,
        actor_type: parse_enum(row, 3)?,
        status: parse_enum(row, 4)?,
        progress: parse_progress(row, 5)?,
        message: row.get(6)?,
        created_at_us: row.get(7)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<TaskComment> {
    Ok(TaskComment {
        comment_id: row.get(0)?,
        task_id: row.get(1)?,
        author_id: row.get(2)?,
        author_type: parse_enum(row, 3)?,
        body: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

fn hydrate(conn: &Connection, task: &mut Task) -> rusqlite::Result<()> {
    task.before_pictures = get_photos(conn, task.id, PhotoPhase::Before)?;
    task.after_pictures = get_photos(conn, task.id, PhotoPhase::After)?;
    task.checklist = get_checklist(conn, task.id)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Fetch a task with its photos and checklist. Returns `None` when absent.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_task(conn: &Connection, task_id: i64) -> rusqlite::Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1");
    let result = conn.query_row(&sql, params![task_id], row_to_task);

    match result {
        Ok(mut task) => {
            hydrate(conn, &mut task)?;
            Ok(Some(task))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// List tasks matching `filter`, ordered by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_tasks(conn: &Connection, filter: &TaskFilter) -> rusqlite::Result<Vec<Task>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<String> = Vec::new();

    if !filter.include_drafts {
        conditions.push("status <> 'draft'".to_string());
    }
    if let Some(ref assignee) = filter.assignee_id {
        param_values.push(assignee.clone());
        conditions.push(format!("assignee_id = ?{}", param_values.len()));
    }
    if let Some(ref assigner) = filter.assigner_id {
        param_values.push(assigner.clone());
        conditions.push(format!("assigner_id = ?{}", param_values.len()));
    }

    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
    if !conditions.is_empty() {
        let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY task_id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut tasks = stmt
        .query_map(params_from_iter(param_values.iter()), row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for task in &mut tasks {
        hydrate(conn, task)?;
    }
    Ok(tasks)
}

/// Insert a new task row and its initial checklist, returning the new id.
///
/// # Errors
///
/// Returns an error if the insert violates a constraint or the query fails.
pub fn insert_task(
    conn: &Connection,
    new: &NewTask,
    assigner_id: &str,
    status: Status,
    now_us: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tasks (
            title, description, category, priority, status, due_date,
            estimated_hours, building_name, unit_number, location, notes,
            progress, assigner_id, assignee_id, created_at_us, updated_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?13, ?14, ?14)",
        params![
            new.title,
            new.description,
            new.category.as_str(),
            new.priority.as_str(),
            status.as_str(),
            new.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
            new.estimated_hours,
            new.building_name,
            new.unit_number,
            new.location,
            new.notes,
            assigner_id,
            new.assignee_id,
            now_us,
        ],
    )?;
    let task_id = conn.last_insert_rowid();
    replace_checklist(conn, task_id, &new.checklist)?;
    Ok(task_id)
}

/// Persist the mutable columns of `task`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn save_task(conn: &Connection, task: &Task) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tasks SET
            status = ?2,
            progress = ?3,
            notes = ?4,
            findings = ?5,
            recommendations = ?6,
            hold_reason = ?7,
            actual_hours = ?8,
            updated_at_us = ?9
         WHERE task_id = ?1",
        params![
            task.id,
            task.status.as_str(),
            i64::from(task.progress),
            task.notes,
            task.findings,
            task.recommendations,
            task.hold_reason,
            task.actual_hours,
            task.updated_at_us,
        ],
    )?;
    Ok(())
}

/// Delete a task; logs, photos, and checklist rows cascade.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_task(conn: &Connection, task_id: i64) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id])?;
    Ok(removed > 0)
}

// ---------------------------------------------------------------------------
// Photos and checklist
// ---------------------------------------------------------------------------

/// Photo references for one phase, in the order they were added.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_photos(
    conn: &Connection,
    task_id: i64,
    phase: PhotoPhase,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT reference FROM task_photos
         WHERE task_id = ?1 AND phase = ?2
         ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![task_id, phase.as_str()], |row| row.get(0))?;
    rows.collect()
}

/// Whether any task still lists `reference` as evidence.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn photo_is_referenced(conn: &Connection, reference: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM task_photos WHERE reference = ?1 LIMIT 1",
        params![reference],
        |_| Ok(()),
    )
    .optional()
    .map(|hit| hit.is_some())
}

/// Append photo references after the existing ones for `phase`.
///
/// # Errors
///
/// Returns an error if an insert fails.
pub fn append_photos(
    conn: &Connection,
    task_id: i64,
    phase: PhotoPhase,
    references: &[String],
    now_us: i64,
) -> rusqlite::Result<()> {
    if references.is_empty() {
        return Ok(());
    }
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM task_photos
         WHERE task_id = ?1 AND phase = ?2",
        params![task_id, phase.as_str()],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO task_photos (task_id, phase, position, reference, added_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (offset, reference) in (0_i64..).zip(references) {
        stmt.execute(params![
            task_id,
            phase.as_str(),
            next + offset,
            reference,
            now_us
        ])?;
    }
    Ok(())
}

/// The task's checklist in display order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_checklist(conn: &Connection, task_id: i64) -> rusqlite::Result<Vec<ChecklistItem>> {
    let mut stmt = conn.prepare_cached(
        "SELECT item, completed FROM task_checklist
         WHERE task_id = ?1
         ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![task_id], |row| {
        Ok(ChecklistItem {
            item: row.get(0)?,
            completed: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Replace the checklist wholesale.
///
/// # Errors
///
/// Returns an error if a delete or insert fails.
pub fn replace_checklist(
    conn: &Connection,
    task_id: i64,
    items: &[ChecklistItem],
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM task_checklist WHERE task_id = ?1",
        params![task_id],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO task_checklist (task_id, position, item, completed)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, item) in (0_i64..).zip(items) {
        stmt.execute(params![task_id, position, item.item, item.completed])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Update and comment logs
// ---------------------------------------------------------------------------

/// Append one row to the update log, returning its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_update(conn: &Connection, record: &UpdateRecord<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO task_updates (
            task_id, actor_id, actor_type, status, progress, message, created_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.task_id,
            record.actor_id,
            record.actor_type.as_str(),
            record.status.as_str(),
            record.progress.map(i64::from),
            record.message,
            record.created_at_us,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Update log for a task, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_updates(conn: &Connection, task_id: i64) -> rusqlite::Result<Vec<TaskUpdate>> {
    let mut stmt = conn.prepare_cached(
        "SELECT update_id, task_id, actor_id, actor_type, status, progress, message, created_at_us
         FROM task_updates
         WHERE task_id = ?1
         ORDER BY created_at_us ASC, update_id ASC",
    )?;
    let rows = stmt.query_map(params![task_id], row_to_update)?;
    rows.collect()
}

/// Append a comment, returning its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_comment(
    conn: &Connection,
    task_id: i64,
    author_id: &str,
    author_type: ActorType,
    body: &str,
    now_us: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO task_comments (task_id, author_id, author_type, body, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![task_id, author_id, author_type.as_str(), body, now_us],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments for a task, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_comments(conn: &Connection, task_id: i64) -> rusqlite::Result<Vec<TaskComment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT comment_id, task_id, author_id, author_type, body, created_at_us
         FROM task_comments
         WHERE task_id = ?1
         ORDER BY created_at_us ASC, comment_id ASC",
    )?;
    let rows = stmt.query_map(params![task_id], row_to_comment)?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Read-model epochs
// ---------------------------------------------------------------------------

/// Increment the epoch for `scope`, creating it at 1.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn bump_epoch(conn: &Connection, scope: &str, now_us: i64) -> rusqlite::Result<u64> {
    conn.execute(
        "INSERT INTO read_model_epochs (scope, epoch, bumped_at_us)
         VALUES (?1, 1, ?2)
         ON CONFLICT(scope) DO UPDATE SET
            epoch = epoch + 1,
            bumped_at_us = excluded.bumped_at_us",
        params![scope, now_us],
    )?;
    read_epoch(conn, scope)
}

/// Current epoch for `scope`; 0 when the scope was never bumped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn read_epoch(conn: &Connection, scope: &str) -> rusqlite::Result<u64> {
    let epoch: Option<i64> = conn
        .query_row(
            "SELECT epoch FROM read_model_epochs WHERE scope = ?1",
            params![scope],
            |row| row.get(0),
        )
        .optional()?;
    Ok(epoch.and_then(|e| u64::try_from(e).ok()).unwrap_or(0))
}
