use crate::cmd::{parse_id, write_task_line};
use crate::output::{OutputMode, pretty_kv, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::lifecycle::Lifecycle;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct NotesArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,

    /// New notes text.
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    pub text: Option<String>,

    /// Remove the notes.
    #[arg(long)]
    pub clear: bool,
}

/// Execute `ct notes`. Assigner side only.
pub fn run_notes(
    args: &NotesArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let notes = if args.clear { None } else { args.text.as_deref() };
    let task = Lifecycle::new(&mut conn, &clock)
        .update_notes(&session, id, notes)
        .map_err(|err| reject(output, &err))?;

    render_mode(output, &task, write_task_line, |t, w| {
        writeln!(w, "✓ Notes updated on {}", t.task_number)?;
        pretty_kv(w, "Notes", t.notes.as_deref().unwrap_or("(none)"))
    })
}
