//! `ct status`: move a task through its lifecycle.

use crate::cmd::{parse_id, write_task_line, write_task_pretty};
use crate::output::{OutputMode, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::draft::StatusDraft;
use caretaker_core::error::CaretakerError;
use caretaker_core::lifecycle::Lifecycle;
use caretaker_core::model::task::{Status, Task};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,

    /// Target status (accepted, in_progress, on_hold, pending_review,
    /// completed, cancelled, assigned).
    pub status: String,

    /// Progress percentage (in_progress or completed only).
    #[arg(long, allow_hyphen_values = true)]
    pub progress: Option<i64>,

    /// Before-work photo reference (repeatable).
    #[arg(long = "before")]
    pub before: Vec<String>,

    /// After-work photo reference (repeatable).
    #[arg(long = "after")]
    pub after: Vec<String>,

    /// What was found on site.
    #[arg(long)]
    pub findings: Option<String>,

    /// Follow-up recommendations.
    #[arg(long)]
    pub recommendations: Option<String>,

    /// Hours actually spent.
    #[arg(long)]
    pub actual_hours: Option<f64>,

    /// Reason for putting the task on hold.
    #[arg(long)]
    pub reason: Option<String>,

    /// Message recorded in the update log.
    #[arg(short, long)]
    pub message: Option<String>,
}

impl StatusArgs {
    /// Stage this request over the stored task.
    pub(crate) fn draft(&self, task: &Task) -> Result<StatusDraft, CaretakerError> {
        let target: Status = self.status.parse()?;
        let mut draft = StatusDraft::for_task(task, target);
        if let Some(progress) = self.progress {
            draft.set_progress(progress);
        }
        for reference in &self.before {
            draft.add_before(reference.as_str());
        }
        for reference in &self.after {
            draft.add_after(reference.as_str());
        }
        if let Some(findings) = &self.findings {
            draft.set_findings(findings.as_str());
        }
        if let Some(recommendations) = &self.recommendations {
            draft.set_recommendations(recommendations.as_str());
        }
        if let Some(hours) = self.actual_hours {
            draft.set_actual_hours(hours);
        }
        if let Some(reason) = &self.reason {
            draft.set_pause_reason(reason.as_str());
        }
        if let Some(message) = &self.message {
            draft.set_message(message.as_str());
        }
        Ok(draft)
    }
}

pub fn run_status(
    args: &StatusArgs,
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
    let draft = args.draft(&current).map_err(|err| reject(output, &err))?;
    let task = lifecycle
        .update_status(&session, id, &draft.commit())
        .map_err(|err| reject(output, &err))?;

    render_status_result(output, &task)
}

/// Shared renderer for commands that end in a status update.
pub fn render_status_result(output: OutputMode, task: &Task) -> anyhow::Result<()> {
    render_mode(output, task, write_task_line, |t, w| {
        writeln!(w, "✓ {} is now {}", t.task_number, t.status)?;
        writeln!(w)?;
        write_task_pretty(t, w)
    })
}
