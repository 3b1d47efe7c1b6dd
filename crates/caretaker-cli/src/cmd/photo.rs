//! `ct photo`: store evidence photos and print their references.

use crate::output::{OutputMode, pretty_kv, reject, render_mode};
use crate::project::Project;
use crate::session;
use caretaker_core::error::CaretakerError;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct PhotoArgs {
    #[command(subcommand)]
    pub command: PhotoCommand,
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
    #[command(
        about = "Store a photo and print its reference",
        after_help = "EXAMPLES:\n    # Store a before photo, then start work with it\n    REF=$(ct photo add tap.jpg --format text)\n    ct status TSK-00001 in_progress --before \"$REF\""
    )]
    Add(PhotoAddArgs),
}

#[derive(Args, Debug)]
pub struct PhotoAddArgs {
    /// Image file to store.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct PhotoOutput {
    reference: String,
    file: String,
}

pub fn run_photo(
    args: &PhotoArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        PhotoCommand::Add(add) => run_photo_add(add, token_flag, output, project_root),
    }
}

fn run_photo_add(
    args: &PhotoAddArgs,
    token_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let session = session::require_session(&project, token_flag, output)?;

    let reference = project
        .objects()
        .put_file(&args.file)
        .map_err(|err| reject(output, &CaretakerError::from(err)))?;
    info!(user = %session.user_id, reference = %reference, "stored photo");

    let report = PhotoOutput {
        reference,
        file: args.file.display().to_string(),
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}", r.reference),
        |r, w| {
            writeln!(w, "✓ Stored {}", r.file)?;
            pretty_kv(w, "Reference", &r.reference)
        },
    )
}
