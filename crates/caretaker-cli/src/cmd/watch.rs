//! `ct watch`: re-render a task or dashboard whenever it changes.

use crate::cmd::list::{BoardTarget, ListArgs, load_board, render_board};
use crate::cmd::parse_id;
use crate::cmd::show::render_detail;
use crate::output::{OutputMode, reject};
use crate::project::Project;
use crate::session;
use caretaker_core::clock::SystemClock;
use caretaker_core::dashboard::DashboardKind;
use caretaker_core::error::CaretakerError;
use caretaker_core::lifecycle::Lifecycle;
use caretaker_core::refresh::{RefreshSchedule, Scope};
use clap::Args;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Task number to watch; omit to watch a dashboard.
    #[arg(conflicts_with_all = ["assignee", "assigner"])]
    pub id: Option<String>,

    #[command(flatten)]
    pub board: ListArgs,

    /// Seconds between polls (defaults to the `[refresh]` config).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop after this many polls.
    #[arg(long)]
    pub iterations: Option<u32>,
}

enum Watched {
    Task(i64),
    Board(BoardTarget),
}

pub fn run_watch(
    args: &WatchArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    quiet: bool,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;

    let (watched, scope, default_interval) = match &args.id {
        Some(raw) => {
            let id = parse_id(raw, output)?;
            (
                Watched::Task(id),
                Scope::Task(id),
                project.config.refresh.task_detail_interval(),
            )
        }
        None => {
            let target = args.board.target(&session);
            let scope = match target.kind {
                DashboardKind::Assignee => Scope::Assignee(target.owner.clone()),
                DashboardKind::Assigner => Scope::Assigner(target.owner.clone()),
            };
            (
                Watched::Board(target),
                scope,
                project.config.refresh.task_list_interval(),
            )
        }
    };
    let interval = args.interval.map_or(default_interval, Duration::from_secs);
    let mut schedule = RefreshSchedule::new(scope, interval);

    if !quiet && !output.is_json() {
        eprintln!(
            "watching {} every {}s (Ctrl-C to stop)",
            schedule.scope(),
            interval.as_secs()
        );
    }

    let mut conn = project.connect(output)?;
    let clock = SystemClock;
    let mut polls: u32 = 0;
    loop {
        let poll = schedule
            .poll(&conn)
            .map_err(|err| reject(output, &CaretakerError::from(err)))?;
        if poll.is_changed() {
            let mut lifecycle = Lifecycle::new(&mut conn, &clock);
            match &watched {
                Watched::Task(id) => {
                    let detail = lifecycle
                        .get_task_detail(&session, *id)
                        .map_err(|err| reject(output, &err))?;
                    render_detail(output, &detail)?;
                }
                Watched::Board(target) => {
                    let board = load_board(&mut lifecycle, &session, target)
                        .map_err(|err| reject(output, &err))?;
                    render_board(output, &board)?;
                }
            }
        } else {
            debug!(scope = %schedule.scope(), "no change");
        }

        polls = polls.saturating_add(1);
        if args.iterations.is_some_and(|limit| polls >= limit) {
            return Ok(());
        }
        std::thread::sleep(schedule.interval());
    }
}
