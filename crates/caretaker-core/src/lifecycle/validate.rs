//! Field validation shared by lifecycle operations.

use crate::error::CaretakerError;
use crate::model::task::{ChecklistItem, NewTask};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_COMMENT_BODY_CHARS: usize = 8_192;
pub const MAX_CHECKLIST_ITEM_CHARS: usize = 500;

/// Non-blank, bounded, no control characters other than newline and tab.
///
/// # Errors
///
/// Returns [`CaretakerError::Validation`] naming `message`.
pub fn comment_body(body: &str) -> Result<(), CaretakerError> {
    if body.trim().is_empty() {
        return Err(CaretakerError::validation("message", "must not be empty"));
    }

    let chars = body.chars().count();
    if chars > MAX_COMMENT_BODY_CHARS {
        return Err(CaretakerError::validation(
            "message",
            format!("must be <= {MAX_COMMENT_BODY_CHARS} characters (got {chars})"),
        ));
    }

    if body
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        return Err(CaretakerError::validation(
            "message",
            "must not contain control characters",
        ));
    }

    Ok(())
}

/// # Errors
///
/// Returns [`CaretakerError::Validation`] for blank, multi-line, or overlong titles.
pub fn title(title: &str) -> Result<(), CaretakerError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CaretakerError::validation("title", "must not be empty"));
    }
    if trimmed.contains(['\n', '\r']) {
        return Err(CaretakerError::validation("title", "must be a single line"));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(CaretakerError::validation(
            "title",
            format!("must be <= {MAX_TITLE_CHARS} characters (got {chars})"),
        ));
    }
    Ok(())
}

/// User ids are opaque but must be non-blank and free of whitespace.
///
/// # Errors
///
/// Returns [`CaretakerError::Validation`] naming `field`.
pub fn user_id(field: &'static str, id: &str) -> Result<(), CaretakerError> {
    if id.is_empty() {
        return Err(CaretakerError::validation(field, "must not be empty"));
    }
    if id.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(CaretakerError::validation(
            field,
            format!("'{id}' must not contain whitespace"),
        ));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`CaretakerError::Validation`] for negative or non-finite hours.
pub fn hours(field: &'static str, value: Option<f64>) -> Result<(), CaretakerError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(CaretakerError::validation(
            field,
            format!("must be a non-negative number, got {v}"),
        )),
        _ => Ok(()),
    }
}

/// # Errors
///
/// Returns [`CaretakerError::Validation`] when any reference is blank.
pub fn photo_references(field: &'static str, references: &[String]) -> Result<(), CaretakerError> {
    if references.iter().any(|r| r.trim().is_empty()) {
        return Err(CaretakerError::validation(
            field,
            "photo references must not be blank",
        ));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`CaretakerError::Validation`] for blank or overlong item text.
pub fn checklist(items: &[ChecklistItem]) -> Result<(), CaretakerError> {
    for (index, entry) in items.iter().enumerate() {
        if entry.item.trim().is_empty() {
            return Err(CaretakerError::validation(
                "checklist",
                format!("item {} must not be blank", index + 1),
            ));
        }
        if entry.item.chars().count() > MAX_CHECKLIST_ITEM_CHARS {
            return Err(CaretakerError::validation(
                "checklist",
                format!(
                    "item {} must be <= {MAX_CHECKLIST_ITEM_CHARS} characters",
                    index + 1
                ),
            ));
        }
    }
    Ok(())
}

/// Validate every field of a task creation request.
///
/// # Errors
///
/// Returns the first [`CaretakerError::Validation`] encountered.
pub fn new_task(new: &NewTask) -> Result<(), CaretakerError> {
    title(&new.title)?;
    user_id("assignee_id", &new.assignee_id)?;
    hours("estimated_hours", new.estimated_hours)?;
    checklist(&new.checklist)
}
