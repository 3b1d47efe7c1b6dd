use crate::output::{CliError, OutputMode, fail, pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use caretaker_core::auth::generate_secret;
use caretaker_core::config::{self, PROJECT_DIR, ProjectConfig, ProjectPaths};
use caretaker_core::db;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.caretaker/` already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    project_dir: String,
    config: String,
    store: String,
    objects: String,
    secret_created: bool,
}

const GITIGNORE: &str = "caretaker.db\ncaretaker.db-*\nsecret\nobjects/\n";

/// Execute `ct init`. Creates the project skeleton:
///
/// ```text
/// .caretaker/
///   config.toml     (default project config)
///   secret          (token signing secret, kept on --force)
///   caretaker.db    (migrated task store)
///   objects/        (photo store)
///   .gitignore
/// ```
///
/// # Errors
///
/// Returns an error if `.caretaker/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(
    args: &InitArgs,
    output: OutputMode,
    quiet: bool,
    project_root: &Path,
) -> Result<()> {
    let state_dir = project_root.join(PROJECT_DIR);
    if state_dir.exists() && !args.force {
        return Err(fail(
            output,
            &CliError::with_details(
                ".caretaker/ already exists",
                "Use `ct init --force` to rewrite the config",
                "already_initialized",
            ),
        ));
    }

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create {}", state_dir.display()))?;

    let project_config = ProjectConfig::default();
    let paths = ProjectPaths::resolve(project_root, &project_config);

    std::fs::write(
        &paths.config_file,
        config::render_project_config(&project_config)?,
    )
    .with_context(|| format!("Failed to write config: {}", paths.config_file.display()))?;

    let secret_created = !paths.secret_file.exists();
    if secret_created {
        std::fs::write(&paths.secret_file, format!("{}\n", generate_secret()))
            .with_context(|| format!("Failed to write secret: {}", paths.secret_file.display()))?;
    }

    let gitignore = state_dir.join(".gitignore");
    std::fs::write(&gitignore, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore.display()))?;

    std::fs::create_dir_all(&paths.objects)
        .with_context(|| format!("Failed to create {}", paths.objects.display()))?;
    drop(db::open_store(&paths.store)?);

    info!(root = %project_root.display(), secret_created, "initialized project");

    let report = InitOutput {
        ok: true,
        project_dir: state_dir.display().to_string(),
        config: paths.config_file.display().to_string(),
        store: paths.store.display().to_string(),
        objects: paths.objects.display().to_string(),
        secret_created,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "initialized {}", r.project_dir),
        |r, w| {
            writeln!(w, "✓ Initialized .caretaker/ project structure.")?;
            writeln!(w)?;
            pretty_kv(w, "Config", &r.config)?;
            pretty_kv(w, "Store", &r.store)?;
            pretty_kv(w, "Objects", &r.objects)?;
            if quiet {
                return Ok(());
            }
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  Issue a token and export it:")?;
            writeln!(
                w,
                "    export CARETAKER_TOKEN=$(ct login --user pm-1 --role property_manager --format text)"
            )?;
            writeln!(w, "  Create a task:")?;
            writeln!(
                w,
                "    ct create --title \"Fix leaking tap\" --assignee staff-1"
            )
        },
    )
}
