//! Pure transition planning.
//!
//! [`plan_transition`] decides whether a requested status change is legal for
//! a task as currently stored and, if so, what the stored row must look like
//! afterwards. It touches no I/O; [`super::Lifecycle::update_status`] applies
//! the plan inside a transaction.

use serde::{Deserialize, Serialize};

use super::validate;
use crate::error::CaretakerError;
use crate::model::session::ActorType;
use crate::model::task::{InvalidTransition, PhotoPhase, Status, Task};

/// Upper bound on progress, in percent.
pub const MAX_PROGRESS: u8 = 100;

/// A requested status change with the evidence and fields that travel with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusChange {
    pub status: Option<Status>,
    /// Raw percentage; clamped to `[0, 100]` before use.
    pub progress_percentage: Option<i64>,
    pub before_pictures: Vec<String>,
    pub after_pictures: Vec<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub actual_hours: Option<f64>,
    pub pause_reason: Option<String>,
    pub message: Option<String>,
}

impl StatusChange {
    #[must_use]
    pub fn to(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A progress report (quick action). Reports at 100 complete the task.
    #[must_use]
    pub fn progress(percentage: i64) -> Self {
        Self {
            status: Some(Status::InProgress),
            progress_percentage: Some(percentage),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_progress(mut self, percentage: i64) -> Self {
        self.progress_percentage = Some(percentage);
        self
    }

    #[must_use]
    pub fn with_before(mut self, reference: impl Into<String>) -> Self {
        self.before_pictures.push(reference.into());
        self
    }

    #[must_use]
    pub fn with_after(mut self, reference: impl Into<String>) -> Self {
        self.after_pictures.push(reference.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_pause_reason(mut self, reason: impl Into<String>) -> Self {
        self.pause_reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn pictures(&self, phase: PhotoPhase) -> &[String] {
        match phase {
            PhotoPhase::Before => &self.before_pictures,
            PhotoPhase::After => &self.after_pictures,
        }
    }
}

/// The outcome of a validated status change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub from: Status,
    /// Effective target; may differ from the request when progress hits 100.
    pub to: Status,
    pub side: ActorType,
    /// Progress to store on the task row.
    pub progress: u8,
    /// Progress to record on the update log entry.
    pub logged_progress: Option<u8>,
    pub hold_reason: Option<String>,
    pub message: String,
}

/// Clamp a raw percentage into `[0, 100]`.
#[must_use]
pub fn clamp_progress(raw: i64) -> u8 {
    u8::try_from(raw.clamp(0, i64::from(MAX_PROGRESS))).unwrap_or(MAX_PROGRESS)
}

/// Validate `change` against `task` for a caller on `side`.
///
/// Checks run in order: terminal state, lifecycle edge, actor side, field
/// validation, then evidence.
///
/// # Errors
///
/// - [`CaretakerError::InvalidTransition`] for closed tasks, moves outside the
///   lifecycle, progress reports without a percentage, and missing evidence.
/// - [`CaretakerError::Forbidden`] when the move belongs to the other side.
/// - [`CaretakerError::Validation`] for malformed fields.
pub fn plan_transition(
    task: &Task,
    side: ActorType,
    change: &StatusChange,
) -> Result<TransitionPlan, CaretakerError> {
    let requested = change
        .status
        .ok_or_else(|| CaretakerError::validation("status", "a target status is required"))?;
    let clamped = change.progress_percentage.map(clamp_progress);
    let target = if requested == Status::InProgress && clamped == Some(MAX_PROGRESS) {
        Status::Completed
    } else {
        requested
    };
    let from = task.status;

    let owner = from.check_transition(target)?;

    if from == Status::InProgress && target == Status::InProgress && clamped.is_none() {
        return Err(InvalidTransition {
            from,
            to: target,
            reason: "a progress report requires a progress percentage",
        }
        .into());
    }

    if owner != side {
        return Err(CaretakerError::forbidden(format!(
            "only the {owner} may move {} from {from} to {target}",
            task.task_number
        )));
    }

    if clamped.is_some() && !matches!(target, Status::InProgress | Status::Completed) {
        return Err(CaretakerError::validation(
            "progress_percentage",
            format!("progress can only be reported while in progress, not when moving to {target}"),
        ));
    }

    validate::hours("actual_hours", change.actual_hours)?;
    validate::photo_references("before_pictures", &change.before_pictures)?;
    validate::photo_references("after_pictures", &change.after_pictures)?;

    require_evidence(task, change, target)?;

    let progress = match target {
        Status::Completed => MAX_PROGRESS,
        Status::InProgress => clamped.unwrap_or(task.progress),
        _ => task.progress,
    };
    let logged_progress = match target {
        Status::Completed => Some(MAX_PROGRESS),
        Status::InProgress => clamped,
        _ => None,
    };

    let hold_reason = if target == Status::OnHold {
        non_blank(change.pause_reason.as_deref())
    } else {
        None
    };

    let message = non_blank(change.message.as_deref())
        .unwrap_or_else(|| default_message(from, target, progress, hold_reason.as_deref()));

    Ok(TransitionPlan {
        from,
        to: target,
        side,
        progress,
        logged_progress,
        hold_reason,
        message,
    })
}

fn require_evidence(task: &Task, change: &StatusChange, target: Status) -> Result<(), CaretakerError> {
    let (phase, reason) = match target {
        Status::InProgress => (
            PhotoPhase::Before,
            "at least one before photo is required to work on a task",
        ),
        Status::Completed => (
            PhotoPhase::After,
            "at least one after photo is required to complete a task",
        ),
        _ => return Ok(()),
    };

    let available = task.pictures(phase).len() + change.pictures(phase).len();
    if available == 0 {
        return Err(InvalidTransition {
            from: task.status,
            to: target,
            reason,
        }
        .into());
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn default_message(from: Status, to: Status, progress: u8, hold_reason: Option<&str>) -> String {
    match (from, to) {
        (Status::Draft, Status::Assigned) => "Task published".to_string(),
        (_, Status::Accepted) => "Task accepted".to_string(),
        (Status::Accepted, Status::InProgress) => "Work started".to_string(),
        (Status::OnHold, Status::InProgress) => "Work resumed".to_string(),
        (Status::PendingReview, Status::InProgress) => "Returned for rework".to_string(),
        (Status::InProgress, Status::InProgress) => format!("Progress updated to {progress}%"),
        (_, Status::OnHold) => hold_reason.map_or_else(
            || "Work paused".to_string(),
            |reason| format!("Work paused: {reason}"),
        ),
        (_, Status::PendingReview) => "Submitted for review".to_string(),
        (_, Status::Completed) => "Task completed".to_string(),
        (_, Status::Cancelled) => "Task cancelled".to_string(),
        (_, to) => format!("Status changed to {to}"),
    }
}
