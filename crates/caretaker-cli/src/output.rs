//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for scripts, or stable
//! JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format`
//! 2. hidden `--json` flag
//! 3. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 4. `output` in the user config
//! 5. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use caretaker_core::config;
use caretaker_core::error::{CaretakerError, ErrorCode};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Token-efficient plain text for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Parse a normalized mode name (`pretty`, `text`, `json` or an alias).
    pub fn from_name(raw: &str) -> Option<Self> {
        match config::normalize_output_mode(raw)? {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => Some(Self::Text),
        }
    }
}

/// Resolve the output mode from CLI flags, environment, user config, and TTY.
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    user_output: Option<String>,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    let env_format = std::env::var("FORMAT").ok();
    let resolved = config::resolve_output(json_flag, user_output, env_format);
    OutputMode::from_name(&resolved).unwrap_or(OutputMode::Text)
}

/// Render a serializable value with explicit pretty/text renderers.
///
/// # Errors
///
/// Returns an error if serialization or writing to stdout fails.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render a serializable value; pretty and text share one renderer.
///
/// # Errors
///
/// Returns an error if serialization or writing to stdout fails.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => human_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E2002").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error kind (e.g. "invalid_transition").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CliError {
    /// Create an error with a suggestion and error code.
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
            kind: None,
        }
    }

    /// Build from one of the shared error codes, using its stock hint.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
            kind: Some(code.kind().to_string()),
        }
    }
}

impl From<&CaretakerError> for CliError {
    fn from(err: &CaretakerError) -> Self {
        let code = err.code();
        Self {
            message: err.to_string(),
            suggestion: Some(err.suggestion()),
            error_code: Some(code.code().to_string()),
            kind: Some(code.kind().to_string()),
        }
    }
}

/// Render an error to stderr in the requested format.
///
/// # Errors
///
/// Returns an error if writing to stderr fails.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// An error that has already been written to stderr by [`render_error`].
#[derive(Debug)]
pub struct Reported {
    message: String,
}

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Reported {}

/// Render `error` and return it as an [`anyhow::Error`] for `?` propagation.
///
/// The returned error is marked [`Reported`] so [`exit_code`] does not print
/// it a second time.
pub fn fail(mode: OutputMode, error: &CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(mode, error) {
        return render_err;
    }
    anyhow::Error::new(Reported {
        message: error.message.clone(),
    })
}

/// Render a lifecycle error and convert it for `?` propagation.
pub fn reject(mode: OutputMode, error: &CaretakerError) -> anyhow::Error {
    fail(mode, &CliError::from(error))
}

/// Whether `err` was already rendered to stderr.
pub fn is_reported(err: &anyhow::Error) -> bool {
    err.is::<Reported>()
}

/// Map a command result to the process exit code.
///
/// Errors that escaped without being rendered are reported once as
/// internal errors in the selected mode.
pub fn exit_code(mode: OutputMode, result: anyhow::Result<()>) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };
    if !is_reported(&err) {
        let error = CliError::from_code(ErrorCode::InternalUnexpected, format!("{err:#}"));
        if let Err(render_err) = render_error(mode, &error) {
            eprintln!("error: {err:#} ({render_err})");
        }
    }
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use caretaker_core::model::task::{InvalidTransition, Status};

    #[test]
    fn output_mode_is_json() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Pretty.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn from_name_accepts_aliases() {
        assert_eq!(OutputMode::from_name("json"), Some(OutputMode::Json));
        assert_eq!(OutputMode::from_name("HUMAN"), Some(OutputMode::Pretty));
        assert_eq!(OutputMode::from_name("table"), Some(OutputMode::Text));
        assert_eq!(OutputMode::from_name("fancy"), None);
    }

    #[test]
    fn format_flag_wins() {
        let mode = resolve_output_mode(Some(OutputMode::Text), true, Some("json".into()));
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_beats_user_config() {
        let mode = resolve_output_mode(None, true, Some("pretty".into()));
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn cli_error_with_details() {
        let err = CliError::with_details("no project", "run ct init", "E1001");
        assert_eq!(err.message, "no project");
        assert_eq!(err.suggestion.as_deref(), Some("run ct init"));
        assert_eq!(err.error_code.as_deref(), Some("E1001"));
        assert!(err.kind.is_none());
    }

    #[test]
    fn cli_error_from_transition_error() {
        let err = CaretakerError::from(InvalidTransition {
            from: Status::Completed,
            to: Status::InProgress,
            reason: "task is closed",
        });
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
        assert_eq!(cli.kind.as_deref(), Some("invalid_transition"));
        assert!(cli.message.contains("completed"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn cli_error_from_code_uses_hint() {
        let cli = CliError::from_code(ErrorCode::NotInitialized, "missing .caretaker");
        assert_eq!(cli.error_code.as_deref(), Some("E1001"));
        assert!(cli.suggestion.unwrap_or_default().contains("ct init"));
    }

    #[test]
    fn error_json_shape() {
        let cli = CliError::from_code(ErrorCode::Forbidden, "nope");
        let value = serde_json::json!({ "error": cli });
        assert_eq!(value["error"]["error_code"], "E4003");
        assert_eq!(value["error"]["kind"], "forbidden");
        assert_eq!(value["error"]["message"], "nope");
    }

    #[test]
    fn failed_errors_are_marked_reported() {
        let err = fail(
            OutputMode::Text,
            &CliError::from_code(ErrorCode::TaskNotFound, "task 'TSK-00042' not found"),
        );
        assert!(is_reported(&err));
        assert_eq!(err.to_string(), "task 'TSK-00042' not found");
    }

    #[test]
    fn rejected_lifecycle_errors_are_marked_reported() {
        let err = reject(OutputMode::Json, &CaretakerError::forbidden("not a party"));
        assert!(is_reported(&err));
    }

    #[test]
    fn plain_errors_are_not_reported() {
        let err = anyhow::anyhow!("disk full");
        assert!(!is_reported(&err));
    }

    #[test]
    fn exit_code_reflects_result() {
        let code = |result| format!("{:?}", exit_code(OutputMode::Text, result));
        let success = format!("{:?}", ExitCode::SUCCESS);
        let failure = format!("{:?}", ExitCode::FAILURE);

        assert_eq!(code(Ok(())), success);
        let reported = fail(
            OutputMode::Text,
            &CliError::from_code(ErrorCode::Forbidden, "nope"),
        );
        assert_eq!(code(Err(reported)), failure);
        assert_eq!(code(Err(anyhow::anyhow!("disk full"))), failure);
    }

    #[test]
    fn render_human_output() {
        #[derive(Serialize)]
        struct Row {
            name: String,
        }
        let row = Row {
            name: "tap".into(),
        };
        let result = render(OutputMode::Pretty, &row, |r, w| writeln!(w, "{}", r.name));
        assert!(result.is_ok());
    }

    #[test]
    fn pretty_kv_pads_key() {
        let mut buf = Vec::new();
        pretty_kv(&mut buf, "Status", "accepted").expect("write");
        let line = String::from_utf8(buf).expect("utf8");
        assert!(line.starts_with("Status:"));
        assert!(line.trim_end().ends_with("accepted"));
    }
}
