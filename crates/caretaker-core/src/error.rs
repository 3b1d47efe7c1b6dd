use crate::model::task::{InvalidTransition, ParseEnumError};
use std::fmt;

/// Machine-readable error codes shared by the library and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    TaskNotFound,
    InvalidStateTransition,
    InvalidValue,
    Unauthorized,
    Forbidden,
    StoreBusy,
    StorageFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::TaskNotFound => "E2001",
            Self::InvalidStateTransition => "E2002",
            Self::InvalidValue => "E2005",
            Self::Unauthorized => "E4001",
            Self::Forbidden => "E4003",
            Self::StoreBusy => "E5002",
            Self::StorageFailed => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::TaskNotFound => "Task not found",
            Self::InvalidStateTransition => "Invalid status transition",
            Self::InvalidValue => "Invalid input value",
            Self::Unauthorized => "Invalid or expired token",
            Self::Forbidden => "Access denied",
            Self::StoreBusy => "Task store is busy",
            Self::StorageFailed => "Object storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `ct init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .caretaker/config.toml and retry."),
            Self::TaskNotFound => Some("Check the task number with `ct list`."),
            Self::InvalidStateTransition => Some(
                "Follow the lifecycle: assigned -> accepted -> in_progress -> pending_review -> completed.",
            ),
            Self::InvalidValue => Some("Correct the named field and resubmit."),
            Self::Unauthorized => Some("Obtain a fresh token with `ct login` and retry."),
            Self::Forbidden => Some("Ask the task's assigner or an administrator."),
            Self::StoreBusy => Some("Retry after the other `ct` process finishes."),
            Self::StorageFailed => Some("Check the objects directory and its permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// Snake-case kind name used in JSON error payloads.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::ConfigParseError => "config_parse_error",
            Self::TaskNotFound => "not_found",
            Self::InvalidStateTransition => "invalid_transition",
            Self::InvalidValue => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::StoreBusy => "store_busy",
            Self::StorageFailed => "storage_failed",
            Self::InternalUnexpected => "internal_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors returned by every task lifecycle operation.
#[derive(Debug, thiserror::Error)]
pub enum CaretakerError {
    /// The bearer token is missing, malformed, forged, or expired.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The caller is authenticated but may not perform the action.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// A referenced entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Malformed input.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Status change not permitted from the current status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    /// Object storage failed while handling a request.
    #[error("object storage failure: {0}")]
    Storage(String),

    /// Unexpected failure outside the business rules.
    #[error("internal error: {0}")]
    Internal(String),

    /// The underlying SQLite store failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CaretakerError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "task",
            id: crate::model::task::task_number(id),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::NotFound { .. } => ErrorCode::TaskNotFound,
            Self::Validation { .. } => ErrorCode::InvalidValue,
            Self::InvalidTransition(_) => ErrorCode::InvalidStateTransition,
            Self::Storage(_) => ErrorCode::StorageFailed,
            Self::Internal(_) => ErrorCode::InternalUnexpected,
            Self::Database(err) if is_busy(err) => ErrorCode::StoreBusy,
            Self::Database(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Stable `E####` identifier.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        self.code().code()
    }

    /// Remediation text for operators.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.code()
            .hint()
            .unwrap_or_else(|| self.code().message())
            .to_string()
    }

    /// True for failures worth retrying (lock contention while the store starts up).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(err) if is_busy(err))
    }
}

impl From<ParseEnumError> for CaretakerError {
    fn from(err: ParseEnumError) -> Self {
        Self::Validation {
            field: err.expected,
            reason: format!("unknown value '{}'", err.got),
        }
    }
}

/// True when SQLite reported lock contention.
#[must_use]
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if matches!(
                inner.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}
