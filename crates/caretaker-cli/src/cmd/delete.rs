use crate::cmd::parse_id;
use crate::output::{OutputMode, reject, render};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::lifecycle::Lifecycle;
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    ok: bool,
    task_id: i64,
    task_number: String,
    /// Photos attached to the task; ones shared with other tasks stay stored.
    photos: usize,
}

/// Execute `ct delete`. Administrators only; removes the task, its logs, and
/// stored photos no other task still lists.
pub fn run_delete(
    args: &DeleteArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let objects = project.objects();
    let task = Lifecycle::new(&mut conn, &clock)
        .delete_task(&session, id, &objects)
        .map_err(|err| reject(output, &err))?;

    let report = DeleteOutput {
        ok: true,
        task_id: task.id,
        photos: task.before_pictures.len() + task.after_pictures.len(),
        task_number: task.task_number,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ Deleted {} ({} photos)", r.task_number, r.photos)
    })
}
