#![forbid(unsafe_code)]

mod cmd;
mod output;
mod project;
mod session;

use caretaker_core::config;
use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "caretaker: task lifecycle for facility staff",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bearer token (defaults to CARETAKER_TOKEN).
    #[arg(long, global = true)]
    token: Option<String>,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, `FORMAT`, and the user config.
    fn output_mode(&self) -> OutputMode {
        let user_output = config::load_user_config()
            .inspect_err(|err| warn!("ignoring unreadable user config: {err:#}"))
            .ok()
            .and_then(|user| user.output);
        output::resolve_output_mode(self.format, self.json, user_output)
    }

    fn token_flag(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Project",
        about = "Initialize a caretaker project",
        long_about = "Create .caretaker/ with config, token secret, task store, and photo store.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    ct init\n\n    # Rewrite the config, keeping the secret\n    ct init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Project",
        about = "Issue a bearer token",
        long_about = "Issue a signed token for a user and role, valid for the configured lifetime.",
        after_help = "EXAMPLES:\n    # Log in as a property manager\n    export CARETAKER_TOKEN=$(ct login --user pm-1 --role property_manager --format text)\n\n    # Short-lived staff token\n    ct login --user staff-1 --role staff --ttl-hours 1"
    )]
    Login(cmd::login::LoginArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create and assign a task",
        long_about = "Create a task assigned to a staff member, or save it as a draft.",
        after_help = "EXAMPLES:\n    # Assign a plumbing job\n    ct create --title \"Fix leaking tap\" --assignee staff-1 --category plumbing --priority high --due 2026-03-06\n\n    # Save a draft with a checklist\n    ct create --title \"Quarterly inspection\" --assignee staff-2 --item \"Roof\" --item \"Gutters\" --draft"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Change a task's status",
        long_about = "Move a task along its lifecycle, attaching photos, findings, and messages.",
        after_help = "EXAMPLES:\n    # Accept an assigned task\n    ct status TSK-00001 accepted\n\n    # Start work with a before photo\n    ct status TSK-00001 in_progress --before obj:<hash>.jpg\n\n    # Pause with a reason\n    ct status TSK-00001 on_hold --reason \"Waiting for parts\"\n\n    # Submit for review\n    ct status TSK-00001 pending_review --findings \"Worn cartridge\" --actual-hours 2"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Report progress on work in progress",
        long_about = "Quick progress report (25, 50, 75, 100). Reporting 100 completes the task.",
        after_help = "EXAMPLES:\n    # Halfway there\n    ct progress TSK-00001 50\n\n    # Done, with an after photo\n    ct progress TSK-00001 100 --after obj:<hash>.jpg"
    )]
    Progress(cmd::progress::ProgressArgs),

    #[command(
        next_help_heading = "Collaboration",
        about = "Comment on a task",
        after_help = "EXAMPLES:\n    # Add a comment\n    ct comment TSK-00001 \"On site tomorrow morning\""
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Collaboration",
        about = "Edit a task's checklist",
        long_about = "Add, check, uncheck, or remove checklist items. Item numbers start at 1.",
        after_help = "EXAMPLES:\n    # Show the checklist\n    ct checklist TSK-00001\n\n    # Tick the first item and add another\n    ct checklist TSK-00001 --check 1 --add \"Test water pressure\""
    )]
    Checklist(cmd::checklist::ChecklistArgs),

    #[command(
        next_help_heading = "Collaboration",
        about = "Set or clear assigner notes",
        after_help = "EXAMPLES:\n    # Leave a note for the assignee\n    ct notes TSK-00001 \"Key is with the concierge\"\n\n    # Clear the notes\n    ct notes TSK-00001 --clear"
    )]
    Notes(cmd::notes::NotesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one task",
        long_about = "Show a task with its update log and comments.",
        after_help = "EXAMPLES:\n    # Show by task number\n    ct show TSK-00001\n\n    # Emit machine-readable output\n    ct show 1 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a task dashboard",
        long_about = "Show the assignee or assigner dashboard with counts and grouped tasks.",
        after_help = "EXAMPLES:\n    # Your own dashboard\n    ct list\n\n    # Work assigned to one staff member\n    ct list --assignee staff-1"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Re-render a task or dashboard when it changes",
        after_help = "EXAMPLES:\n    # Watch your dashboard\n    ct watch\n\n    # Watch one task, polling every 2 seconds\n    ct watch TSK-00001 --interval 2"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(next_help_heading = "Evidence", about = "Manage evidence photos")]
    Photo(cmd::photo::PhotoArgs),

    #[command(
        next_help_heading = "Project",
        about = "Delete a task",
        long_about = "Delete a task with its history and stored photos. Administrators only.",
        after_help = "EXAMPLES:\n    # Delete a task\n    ct delete TSK-00001"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Project",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ct completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Default log directives; `ct` is the binary's own target.
const DEFAULT_FILTER: &str = "ct=info,caretaker=info,warn";
const DEBUG_FILTER: &str = "ct=debug,caretaker=debug,info";

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CARETAKER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            DEBUG_FILTER
        } else {
            DEFAULT_FILTER
        })
    });

    let format = env::var("CARETAKER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let token = cli.token_flag();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, cli.quiet, &project_root),
        Commands::Login(args) => cmd::login::run_login(args, output, &project_root),
        Commands::Create(args) => cmd::create::run_create(args, token, output, &project_root),
        Commands::Status(args) => cmd::status::run_status(args, token, output, &project_root),
        Commands::Progress(args) => {
            cmd::progress::run_progress(args, token, output, &project_root)
        }
        Commands::Comment(args) => cmd::comment::run_comment(args, token, output, &project_root),
        Commands::Checklist(args) => {
            cmd::checklist::run_checklist(args, token, output, &project_root)
        }
        Commands::Notes(args) => cmd::notes::run_notes(args, token, output, &project_root),
        Commands::Show(args) => cmd::show::run_show(args, token, output, &project_root),
        Commands::List(args) => cmd::list::run_list(args, token, output, &project_root),
        Commands::Watch(args) => {
            cmd::watch::run_watch(args, token, output, cli.quiet, &project_root)
        }
        Commands::Photo(args) => cmd::photo::run_photo(args, token, output, &project_root),
        Commands::Delete(args) => cmd::delete::run_delete(args, token, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    output::exit_code(output, run(&cli, output))
}
