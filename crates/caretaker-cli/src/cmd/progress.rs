//! `ct progress`: quick progress report on work in progress.

use crate::cmd::parse_id;
use crate::cmd::status::render_status_result;
use crate::output::{OutputMode, reject};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::lifecycle::{Lifecycle, StatusChange};
use clap::Args;
use std::path::Path;

/// Steps offered by the quick action.
pub const QUICK_STEPS: [i64; 4] = [25, 50, 75, 100];

#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,

    /// Percentage reached: 25, 50, 75, or 100 (100 completes the task).
    #[arg(value_parser = parse_step)]
    pub percent: i64,

    /// After-work photo reference (repeatable; required at 100).
    #[arg(long = "after")]
    pub after: Vec<String>,

    /// Message recorded in the update log.
    #[arg(short, long)]
    pub message: Option<String>,
}

fn parse_step(raw: &str) -> Result<i64, String> {
    let value: i64 = raw
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if QUICK_STEPS.contains(&value) {
        Ok(value)
    } else {
        Err(format!("progress must be one of {QUICK_STEPS:?}"))
    }
}

impl ProgressArgs {
    fn change(&self) -> StatusChange {
        let mut change = StatusChange::progress(self.percent);
        change.after_pictures.clone_from(&self.after);
        change.message.clone_from(&self.message);
        change
    }
}

pub fn run_progress(
    args: &ProgressArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let task = Lifecycle::new(&mut conn, &clock)
        .update_status(&session, id, &args.change())
        .map_err(|err| reject(output, &err))?;

    render_status_result(output, &task)
}
