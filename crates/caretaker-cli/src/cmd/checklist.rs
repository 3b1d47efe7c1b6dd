//! `ct checklist`: edit a task's checklist through a draft.

use crate::cmd::parse_id;
use crate::output::{OutputMode, pretty_section, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::draft::ChecklistDraft;
use caretaker_core::error::CaretakerError;
use caretaker_core::lifecycle::Lifecycle;
use caretaker_core::model::task::{ChecklistItem, Task};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

#[derive(Args, Debug)]
pub struct ChecklistArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,

    /// Append an item (repeatable).
    #[arg(long)]
    pub add: Vec<String>,

    /// Mark item N done, 1-based (repeatable).
    #[arg(long)]
    pub check: Vec<usize>,

    /// Mark item N not done, 1-based (repeatable).
    #[arg(long)]
    pub uncheck: Vec<usize>,

    /// Remove item N, 1-based (repeatable).
    #[arg(long)]
    pub remove: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct ChecklistOutput {
    task_id: i64,
    task_number: String,
    changed: bool,
    items: Vec<ChecklistItem>,
}

fn zero_based(position: usize) -> Result<usize, CaretakerError> {
    position
        .checked_sub(1)
        .ok_or_else(|| CaretakerError::validation("checklist", "items are numbered from 1"))
}

impl ChecklistArgs {
    /// Apply toggles, then removals (highest first), then additions.
    fn apply(&self, draft: &mut ChecklistDraft) -> Result<(), CaretakerError> {
        for &position in &self.check {
            draft.set_completed(zero_based(position)?, true)?;
        }
        for &position in &self.uncheck {
            draft.set_completed(zero_based(position)?, false)?;
        }

        let mut removals = self
            .remove
            .iter()
            .map(|&p| zero_based(p))
            .collect::<Result<Vec<_>, _>>()?;
        removals.sort_unstable_by(|a, b| b.cmp(a));
        removals.dedup();
        for index in removals {
            draft.remove(index)?;
        }

        for text in &self.add {
            draft.add(text)?;
        }
        Ok(())
    }
}

pub fn run_checklist(
    args: &ChecklistArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let mut lifecycle = Lifecycle::new(&mut conn, &clock);
    let current = lifecycle
        .get_task_detail(&session, id)
        .map_err(|err| reject(output, &err))?
        .task;

    let mut draft = ChecklistDraft::from_task(&current);
    args.apply(&mut draft).map_err(|err| reject(output, &err))?;

    let changed = draft.is_dirty();
    let task: Task = if changed {
        lifecycle
            .update_checklist(&session, id, &draft.commit())
            .map_err(|err| reject(output, &err))?
    } else {
        debug!(task_id = id, "checklist unchanged; nothing to save");
        current
    };

    let report = ChecklistOutput {
        task_id: task.id,
        task_number: task.task_number,
        changed,
        items: task.checklist,
    };
    render_mode(
        output,
        &report,
        |r, w| write_items(w, &r.items),
        |r, w| {
            let done = r.items.iter().filter(|i| i.completed).count();
            pretty_section(
                w,
                &format!("{} checklist ({done}/{} done)", r.task_number, r.items.len()),
            )?;
            write_items(w, &r.items)
        },
    )
}

/// Numbered checklist lines, `[x]` for done items.
pub fn write_items(w: &mut dyn Write, items: &[ChecklistItem]) -> io::Result<()> {
    for (n, item) in items.iter().enumerate() {
        let mark = if item.completed { 'x' } else { ' ' };
        writeln!(w, "{:>3}. [{mark}] {}", n + 1, item.item)?;
    }
    Ok(())
}
