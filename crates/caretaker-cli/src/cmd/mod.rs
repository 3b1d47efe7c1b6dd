pub mod checklist;
pub mod comment;
pub mod completions;
pub mod create;
pub mod delete;
pub mod init;
pub mod list;
pub mod login;
pub mod notes;
pub mod photo;
pub mod progress;
pub mod show;
pub mod status;
pub mod watch;

use crate::output::{OutputMode, pretty_kv, pretty_rule, reject};
use caretaker_core::error::CaretakerError;
use caretaker_core::model::task::{Task, parse_task_ref};
use std::io::{self, Write};

/// Parse a task reference (`42` or `TSK-00042`).
///
/// # Errors
///
/// Renders a validation error for anything else.
pub fn parse_id(raw: &str, output: OutputMode) -> anyhow::Result<i64> {
    parse_task_ref(raw).ok_or_else(|| {
        reject(
            output,
            &CaretakerError::validation("task", format!("'{raw}' is not a task number")),
        )
    })
}

/// One-line task summary used by text output.
pub fn write_task_line(task: &Task, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}  {}  {}%  {}  {}",
        task.task_number, task.status, task.progress, task.priority, task.title
    )
}

/// Header block shared by mutating commands in pretty mode.
pub fn write_task_pretty(task: &Task, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}  {}", task.task_number, task.title)?;
    pretty_rule(w)?;
    pretty_kv(w, "Status", task.status.as_str())?;
    pretty_kv(w, "Progress", format!("{}%", task.progress))?;
    pretty_kv(w, "Priority", task.priority.as_str())?;
    pretty_kv(w, "Category", task.category.as_str())?;
    pretty_kv(w, "Assignee", &task.assignee_id)?;
    pretty_kv(w, "Assigner", &task.assigner_id)?;
    if let Some(due) = task.due_date {
        pretty_kv(w, "Due", due.to_string())?;
    }
    if let Some(reason) = &task.hold_reason {
        pretty_kv(w, "On hold", reason)?;
    }
    Ok(())
}
