//! `ct login`: issue a bearer token for local use.

use crate::output::{OutputMode, pretty_kv, reject, render_mode};
use crate::project::Project;
use caretaker_core::clock::micros_to_rfc3339;
use caretaker_core::error::CaretakerError;
use caretaker_core::model::session::{Role, Session};
use clap::Args;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// User id to embed in the token.
    #[arg(long)]
    pub user: String,

    /// Role: senior_admin, junior_admin, property_manager, contractor,
    /// artisan, staff, or customer.
    #[arg(long)]
    pub role: String,

    /// Token lifetime in hours (defaults to `[auth] token_ttl_hours`).
    #[arg(long)]
    pub ttl_hours: Option<u64>,
}

#[derive(Debug, Serialize)]
struct LoginOutput {
    token: String,
    user_id: String,
    role: Role,
    expires_at: String,
}

pub fn run_login(args: &LoginArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let project = Project::discover(project_root, output)?;
    let authority = project.authority(output)?;

    let role: Role = args
        .role
        .parse()
        .map_err(|err| reject(output, &CaretakerError::from(err)))?;
    let hours = args
        .ttl_hours
        .unwrap_or(project.config.auth.token_ttl_hours);
    if hours == 0 {
        return Err(reject(
            output,
            &CaretakerError::validation("ttl_hours", "must be at least 1"),
        ));
    }

    let session = Session::new(args.user.trim(), role);
    let now = chrono::Utc::now().timestamp();
    let ttl = Duration::from_secs(hours.saturating_mul(3600));
    let token = authority
        .issue(&session, ttl, now)
        .map_err(|err| reject(output, &err))?;

    let expires_unix = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    info!(user = %session.user_id, role = %role, hours, "issued token");

    let report = LoginOutput {
        token,
        user_id: session.user_id,
        role,
        expires_at: micros_to_rfc3339(expires_unix.saturating_mul(1_000_000)),
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}", r.token),
        |r, w| {
            pretty_kv(w, "User", &r.user_id)?;
            pretty_kv(w, "Role", r.role.as_str())?;
            pretty_kv(w, "Expires", &r.expires_at)?;
            pretty_kv(w, "Token", &r.token)?;
            writeln!(w)?;
            writeln!(w, "export CARETAKER_TOKEN={}", r.token)
        },
    )
}
