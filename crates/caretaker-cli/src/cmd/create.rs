//! `ct create`: create and assign a task.

use crate::cmd::{write_task_line, write_task_pretty};
use crate::output::{OutputMode, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::error::CaretakerError;
use caretaker_core::lifecycle::Lifecycle;
use caretaker_core::model::task::{Category, ChecklistItem, NewTask, Priority};
use chrono::NaiveDate;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Short title of the task.
    #[arg(short, long)]
    pub title: String,

    /// What needs doing.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// User id of the staff member doing the work.
    #[arg(short, long)]
    pub assignee: String,

    /// Work category (plumbing, electrical, cleaning, ...).
    #[arg(short, long, default_value = "general")]
    pub category: String,

    /// Priority: low, medium, high, or urgent.
    #[arg(short, long, default_value = "medium")]
    pub priority: String,

    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: Option<String>,

    /// Estimated effort in hours.
    #[arg(long)]
    pub estimated_hours: Option<f64>,

    /// Building name.
    #[arg(long)]
    pub building: Option<String>,

    /// Unit number within the building.
    #[arg(long)]
    pub unit: Option<String>,

    /// Free-form location detail.
    #[arg(long)]
    pub location: Option<String>,

    /// Assigner notes.
    #[arg(long)]
    pub notes: Option<String>,

    /// Checklist item (repeatable).
    #[arg(long = "item")]
    pub items: Vec<String>,

    /// Save as a draft instead of assigning immediately.
    #[arg(long)]
    pub draft: bool,
}

impl CreateArgs {
    fn to_new_task(&self) -> Result<NewTask, CaretakerError> {
        let category: Category = self.category.parse()?;
        let priority: Priority = self.priority.parse()?;
        let due_date = self
            .due
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    CaretakerError::validation("due_date", format!("'{raw}' is not YYYY-MM-DD"))
                })
            })
            .transpose()?;

        Ok(NewTask {
            title: self.title.clone(),
            description: self.description.clone(),
            category,
            priority,
            assignee_id: self.assignee.trim().to_string(),
            due_date,
            estimated_hours: self.estimated_hours,
            building_name: self.building.clone(),
            unit_number: self.unit.clone(),
            location: self.location.clone(),
            notes: self.notes.clone(),
            checklist: self.items.iter().map(ChecklistItem::new).collect(),
            draft: self.draft,
        })
    }
}

pub fn run_create(
    args: &CreateArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let new = args.to_new_task().map_err(|err| reject(output, &err))?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let task = Lifecycle::new(&mut conn, &clock)
        .create_task(&session, &new)
        .map_err(|err| reject(output, &err))?;

    render_mode(output, &task, write_task_line, |t, w| {
        writeln!(w, "✓ Created {}", t.task_number)?;
        writeln!(w)?;
        write_task_pretty(t, w)
    })
}
