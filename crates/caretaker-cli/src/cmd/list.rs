//! `ct list`: assignee and assigner dashboards.

use crate::output::{OutputMode, pretty_kv, pretty_section, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::dashboard::{Bucket, Dashboard, DashboardKind, TaskSummary};
use caretaker_core::error::CaretakerError;
use caretaker_core::lifecycle::Lifecycle;
use caretaker_core::model::session::Session;
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

const BUCKETS: [Bucket; 6] = [
    Bucket::Draft,
    Bucket::New,
    Bucket::Active,
    Bucket::OnHold,
    Bucket::PendingReview,
    Bucket::Closed,
];

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Show the dashboard of work assigned to this user.
    #[arg(long, conflicts_with = "assigner")]
    pub assignee: Option<String>,

    /// Show the dashboard of work created by this user (drafts included).
    #[arg(long)]
    pub assigner: Option<String>,
}

/// Which dashboard a list or watch request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTarget {
    pub kind: DashboardKind,
    pub owner: String,
}

impl ListArgs {
    /// Explicit flags win; otherwise assigning roles see what they created and
    /// everyone else sees what is assigned to them.
    pub fn target(&self, session: &Session) -> BoardTarget {
        if let Some(owner) = &self.assignee {
            return BoardTarget {
                kind: DashboardKind::Assignee,
                owner: owner.clone(),
            };
        }
        if let Some(owner) = &self.assigner {
            return BoardTarget {
                kind: DashboardKind::Assigner,
                owner: owner.clone(),
            };
        }
        let kind = if session.role.can_assign() {
            DashboardKind::Assigner
        } else {
            DashboardKind::Assignee
        };
        BoardTarget {
            kind,
            owner: session.user_id.clone(),
        }
    }
}

/// Load the dashboard for `target`.
///
/// # Errors
///
/// Propagates lifecycle errors (forbidden viewers, store failures).
pub fn load_board(
    lifecycle: &mut Lifecycle<'_>,
    session: &Session,
    target: &BoardTarget,
) -> Result<Dashboard, CaretakerError> {
    match target.kind {
        DashboardKind::Assignee => lifecycle.list_tasks_for_assignee(session, &target.owner),
        DashboardKind::Assigner => lifecycle.list_tasks_for_assigner(session, &target.owner),
    }
}

pub fn run_list(
    args: &ListArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;
    let target = args.target(&session);

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let board = load_board(&mut Lifecycle::new(&mut conn, &clock), &session, &target)
        .map_err(|err| reject(output, &err))?;

    render_board(output, &board)
}

/// Render a dashboard in the selected mode.
pub fn render_board(output: OutputMode, board: &Dashboard) -> anyhow::Result<()> {
    render_mode(output, board, write_board_text, write_board_pretty)
}

fn write_row(w: &mut dyn Write, row: &TaskSummary) -> io::Result<()> {
    let due = row
        .due_date
        .map_or_else(|| "-".to_string(), |d| d.to_string());
    let flag = if row.overdue { "  OVERDUE" } else { "" };
    writeln!(
        w,
        "{}  {:<14} {:>3}%  {:<6}  {}  {}{flag}",
        row.task_number,
        row.status.as_str(),
        row.progress,
        row.priority.as_str(),
        due,
        row.title
    )
}

fn write_board_text(board: &Dashboard, w: &mut dyn Write) -> io::Result<()> {
    for row in &board.tasks {
        write_row(w, row)?;
    }
    Ok(())
}

fn write_board_pretty(board: &Dashboard, w: &mut dyn Write) -> io::Result<()> {
    let heading = match board.kind {
        DashboardKind::Assignee => format!("Assigned to {}", board.owner_id),
        DashboardKind::Assigner => format!("Created by {}", board.owner_id),
    };
    pretty_section(w, &format!("{heading} (as of {})", board.as_of))?;

    let c = &board.counts;
    pretty_kv(
        w,
        "Tasks",
        format!(
            "{} total, {} new, {} active, {} on hold, {} in review, {} completed",
            c.total, c.new_tasks, c.active_tasks, c.on_hold, c.pending_review, c.completed
        ),
    )?;
    if board.kind == DashboardKind::Assigner {
        pretty_kv(w, "Drafts", c.drafts.to_string())?;
    }
    pretty_kv(w, "Overdue", c.overdue.to_string())?;
    let p = &board.by_priority;
    pretty_kv(
        w,
        "Open by prio",
        format!(
            "{} urgent, {} high, {} medium, {} low",
            p.urgent, p.high, p.medium, p.low
        ),
    )?;

    for bucket in BUCKETS {
        let rows: Vec<&TaskSummary> = board.bucket(bucket).collect();
        if rows.is_empty() {
            continue;
        }
        writeln!(w)?;
        pretty_section(w, &format!("{} ({})", bucket.label(), rows.len()))?;
        for row in rows {
            write_row(w, row)?;
        }
    }
    Ok(())
}
