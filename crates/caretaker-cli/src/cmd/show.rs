//! `ct show`: full detail for one task.

use crate::cmd::checklist::write_items;
use crate::cmd::{parse_id, write_task_line, write_task_pretty};
use crate::output::{OutputMode, pretty_kv, pretty_section, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::{SystemClock, micros_to_rfc3339};
use caretaker_core::dashboard::TaskDetail;
use caretaker_core::lifecycle::Lifecycle;
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Task number (`42` or `TSK-00042`).
    pub id: String,
}

pub fn run_show(
    args: &ShowArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let id = parse_id(&args.id, output)?;

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let detail = Lifecycle::new(&mut conn, &clock)
        .get_task_detail(&session, id)
        .map_err(|err| reject(output, &err))?;

    render_detail(output, &detail)
}

/// Render a task detail in the selected mode.
pub fn render_detail(output: OutputMode, detail: &TaskDetail) -> anyhow::Result<()> {
    render_mode(output, detail, write_detail_text, write_detail_pretty)
}

fn write_detail_text(d: &TaskDetail, w: &mut dyn Write) -> io::Result<()> {
    write_task_line(&d.task, w)?;
    for update in &d.updates {
        writeln!(
            w,
            "update  {}  {}  {}  {}",
            micros_to_rfc3339(update.created_at_us),
            update.actor_id,
            update.status,
            update.message.as_deref().unwrap_or("")
        )?;
    }
    for comment in &d.comments {
        writeln!(
            w,
            "comment  {}  {}  {}",
            micros_to_rfc3339(comment.created_at_us),
            comment.author_id,
            comment.body
        )?;
    }
    Ok(())
}

fn write_detail_pretty(d: &TaskDetail, w: &mut dyn Write) -> io::Result<()> {
    let task = &d.task;
    write_task_pretty(task, w)?;
    if d.overdue {
        pretty_kv(w, "Overdue", "yes")?;
    }
    if let Some(building) = &task.building_name {
        let unit = task.unit_number.as_deref().unwrap_or("-");
        pretty_kv(w, "Building", format!("{building} / {unit}"))?;
    }
    if let Some(location) = &task.location {
        pretty_kv(w, "Location", location)?;
    }
    if let Some(hours) = task.estimated_hours {
        pretty_kv(w, "Estimated", format!("{hours}h"))?;
    }
    if let Some(hours) = task.actual_hours {
        pretty_kv(w, "Actual", format!("{hours}h"))?;
    }
    if !task.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", task.description)?;
    }

    for (heading, body) in [
        ("Notes", &task.notes),
        ("Findings", &task.findings),
        ("Recommendations", &task.recommendations),
    ] {
        if let Some(body) = body {
            writeln!(w)?;
            pretty_section(w, heading)?;
            writeln!(w, "{body}")?;
        }
    }

    if !task.checklist.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Checklist")?;
        write_items(w, &task.checklist)?;
    }

    if !task.before_pictures.is_empty() || !task.after_pictures.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Photos")?;
        for reference in &task.before_pictures {
            writeln!(w, "  before  {reference}")?;
        }
        for reference in &task.after_pictures {
            writeln!(w, "  after   {reference}")?;
        }
    }

    writeln!(w)?;
    pretty_section(w, "Updates")?;
    for update in &d.updates {
        let progress = update
            .progress
            .map(|p| format!(" {p}%"))
            .unwrap_or_default();
        writeln!(
            w,
            "{}  {:<14}{}  {} ({})",
            micros_to_rfc3339(update.created_at_us),
            update.status.as_str(),
            progress,
            update.actor_id,
            update.actor_type
        )?;
        if let Some(message) = &update.message {
            writeln!(w, "    {message}")?;
        }
    }

    if !d.comments.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Comments")?;
        for comment in &d.comments {
            writeln!(
                w,
                "{}  {} ({})",
                micros_to_rfc3339(comment.created_at_us),
                comment.author_id,
                comment.author_type
            )?;
            writeln!(w, "    {}", comment.body)?;
        }
    }
    Ok(())
}
