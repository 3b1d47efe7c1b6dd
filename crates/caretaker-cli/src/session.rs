//! Bearer token resolution for CLI commands.
//!
//! The resolution chain: `--token` flag > `CARETAKER_TOKEN` env. Every command
//! that touches tasks verifies the token against the project secret and acts
//! as the resulting [`Session`].

use crate::output::{OutputMode, reject};
use crate::project::Project;
use caretaker_core::auth::TokenVerifier;
use caretaker_core::error::CaretakerError;
use caretaker_core::model::session::Session;
use std::env;
use tracing::debug;

pub const TOKEN_ENV: &str = "CARETAKER_TOKEN";

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_token_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(token) = cli_flag.filter(|t| !t.trim().is_empty()) {
        return Some(token.to_string());
    }
    env.get(TOKEN_ENV)
}

/// Resolve the raw bearer token from `--token` or `CARETAKER_TOKEN`.
pub fn resolve_token(cli_flag: Option<&str>) -> Option<String> {
    resolve_token_with(cli_flag, &RealEnv)
}

/// Verify `token` with `verifier` at `now_unix`.
///
/// # Errors
///
/// Returns [`CaretakerError::Unauthorized`] when no token was supplied or it
/// fails verification.
pub fn verify_token(
    token: Option<&str>,
    verifier: &dyn TokenVerifier,
    now_unix: i64,
) -> Result<Session, CaretakerError> {
    let token = token.ok_or_else(|| {
        CaretakerError::unauthorized(format!("missing bearer token; pass --token or set {TOKEN_ENV}"))
    })?;
    verifier.verify(token, now_unix)
}

/// Resolve and verify the caller's session for a mutating or read command.
///
/// # Errors
///
/// Renders the failure and returns it when the token is missing or invalid.
pub fn require_session(
    project: &Project,
    token_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<Session> {
    let authority = project.authority(output)?;
    let token = resolve_token(token_flag);
    let now = chrono::Utc::now().timestamp();
    let session =
        verify_token(token.as_deref(), &authority, now).map_err(|err| reject(output, &err))?;
    debug!(user = %session.user_id, role = %session.role, "authenticated");
    Ok(session)
}
