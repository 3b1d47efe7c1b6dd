//! Local edit buffers with explicit commit or discard.
//!
//! A draft starts from a snapshot of the stored task, collects edits, and
//! produces the payload for one lifecycle call on [`commit`](ChecklistDraft::commit).
//! Nothing is written until that call is made.

use crate::error::CaretakerError;
use crate::lifecycle::StatusChange;
use crate::model::task::{ChecklistItem, Status, Task};

/// Buffered edits to a checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistDraft {
    task_id: i64,
    base: Vec<ChecklistItem>,
    items: Vec<ChecklistItem>,
}

impl ChecklistDraft {
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            base: task.checklist.clone(),
            items: task.checklist.clone(),
        }
    }

    #[must_use]
    pub const fn task_id(&self) -> i64 {
        self.task_id
    }

    #[must_use]
    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// True when the buffer differs from the snapshot it started from.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.items != self.base
    }

    /// Append an item; returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Validation`] for blank text.
    pub fn add(&mut self, text: &str) -> Result<usize, CaretakerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CaretakerError::validation(
                "checklist",
                "item text must not be blank",
            ));
        }
        self.items.push(ChecklistItem::new(text));
        Ok(self.items.len() - 1)
    }

    /// # Errors
    ///
    /// Returns [`CaretakerError::Validation`] when `index` is out of range.
    pub fn set_completed(&mut self, index: usize, completed: bool) -> Result<(), CaretakerError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))?;
        item.completed = completed;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CaretakerError::Validation`] when `index` is out of range.
    pub fn remove(&mut self, index: usize) -> Result<ChecklistItem, CaretakerError> {
        if index >= self.items.len() {
            return Err(out_of_range(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    /// The replacement list for `update_checklist`.
    #[must_use]
    pub fn commit(self) -> Vec<ChecklistItem> {
        self.items
    }

    /// Drop the edits, returning the untouched snapshot.
    #[must_use]
    pub fn discard(self) -> Vec<ChecklistItem> {
        self.base
    }
}

fn out_of_range(index: usize, len: usize) -> CaretakerError {
    CaretakerError::validation(
        "checklist",
        format!("item {} does not exist (checklist has {len})", index + 1),
    )
}

/// Buffered status change merged with the server's current fields.
///
/// Findings, recommendations, and actual hours start from the stored task so
/// an edit that touches only one of them resubmits the others unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDraft {
    task_id: i64,
    change: StatusChange,
}

impl StatusDraft {
    #[must_use]
    pub fn for_task(task: &Task, target: Status) -> Self {
        let change = StatusChange {
            findings: task.findings.clone(),
            recommendations: task.recommendations.clone(),
            actual_hours: task.actual_hours,
            ..StatusChange::to(target)
        };
        Self {
            task_id: task.id,
            change,
        }
    }

    #[must_use]
    pub const fn task_id(&self) -> i64 {
        self.task_id
    }

    pub fn set_progress(&mut self, percentage: i64) -> &mut Self {
        self.change.progress_percentage = Some(percentage);
        self
    }

    pub fn add_before(&mut self, reference: impl Into<String>) -> &mut Self {
        self.change.before_pictures.push(reference.into());
        self
    }

    pub fn add_after(&mut self, reference: impl Into<String>) -> &mut Self {
        self.change.after_pictures.push(reference.into());
        self
    }

    pub fn set_findings(&mut self, findings: impl Into<String>) -> &mut Self {
        self.change.findings = Some(findings.into());
        self
    }

    pub fn set_recommendations(&mut self, recommendations: impl Into<String>) -> &mut Self {
        self.change.recommendations = Some(recommendations.into());
        self
    }

    pub fn set_actual_hours(&mut self, hours: f64) -> &mut Self {
        self.change.actual_hours = Some(hours);
        self
    }

    pub fn set_pause_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        self.change.pause_reason = Some(reason.into());
        self
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.change.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn pending(&self) -> &StatusChange {
        &self.change
    }

    /// The payload for `update_status`.
    #[must_use]
    pub fn commit(self) -> StatusChange {
        self.change
    }

    pub fn discard(self) {
        tracing::debug!(task_id = self.task_id, "discarded status draft");
    }
}
