//! Read-side projections: task detail and dashboards.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::log::{TaskComment, TaskUpdate};
use crate::model::task::{Category, Priority, Status, Task};

/// A task with its full history, oldest entries first.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    pub task: Task,
    pub overdue: bool,
    pub updates: Vec<TaskUpdate>,
    pub comments: Vec<TaskComment>,
}

/// Whose dashboard is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    Assignee,
    Assigner,
}

/// Dashboard grouping for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Draft,
    New,
    Active,
    OnHold,
    PendingReview,
    Closed,
}

impl Bucket {
    #[must_use]
    pub const fn for_status(status: Status) -> Self {
        match status {
            Status::Draft => Self::Draft,
            Status::Assigned => Self::New,
            Status::Accepted | Status::InProgress => Self::Active,
            Status::OnHold => Self::OnHold,
            Status::PendingReview => Self::PendingReview,
            Status::Completed | Status::Cancelled => Self::Closed,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Drafts",
            Self::New => "New",
            Self::Active => "Active",
            Self::OnHold => "On hold",
            Self::PendingReview => "Pending review",
            Self::Closed => "Closed",
        }
    }
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub id: i64,
    pub task_number: String,
    pub title: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub bucket: Bucket,
    pub progress: u8,
    pub due_date: Option<NaiveDate>,
    pub overdue: bool,
    pub building_name: Option<String>,
    pub unit_number: Option<String>,
    pub assignee_id: String,
    pub assigner_id: String,
}

impl TaskSummary {
    fn from_task(task: &Task, today: NaiveDate) -> Self {
        Self {
            id: task.id,
            task_number: task.task_number.clone(),
            title: task.title.clone(),
            category: task.category,
            priority: task.priority,
            status: task.status,
            bucket: Bucket::for_status(task.status),
            progress: task.progress,
            due_date: task.due_date,
            overdue: task.is_overdue(today),
            building_name: task.building_name.clone(),
            unit_number: task.unit_number.clone(),
            assignee_id: task.assignee_id.clone(),
            assigner_id: task.assigner_id.clone(),
        }
    }
}

/// Bucket counts. `overdue` overlaps the other buckets; the rest partition
/// `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total: usize,
    pub new_tasks: usize,
    pub active_tasks: usize,
    pub on_hold: usize,
    pub pending_review: usize,
    pub completed: usize,
    pub drafts: usize,
    pub overdue: usize,
}

impl DashboardCounts {
    /// The partition buckets add up to `total`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.new_tasks
            + self.active_tasks
            + self.on_hold
            + self.pending_review
            + self.completed
            + self.drafts
            == self.total
    }

    fn record(&mut self, bucket: Bucket, overdue: bool) {
        self.total += 1;
        match bucket {
            Bucket::Draft => self.drafts += 1,
            Bucket::New => self.new_tasks += 1,
            Bucket::Active => self.active_tasks += 1,
            Bucket::OnHold => self.on_hold += 1,
            Bucket::PendingReview => self.pending_review += 1,
            Bucket::Closed => self.completed += 1,
        }
        if overdue {
            self.overdue += 1;
        }
    }
}

/// Open (non-terminal) tasks per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub urgent: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    fn record(&mut self, priority: Priority) {
        match priority {
            Priority::Urgent => self.urgent += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub owner_id: String,
    pub kind: DashboardKind,
    pub as_of: NaiveDate,
    pub counts: DashboardCounts,
    pub by_priority: PriorityCounts,
    pub tasks: Vec<TaskSummary>,
}

impl Dashboard {
    /// Group, count, and order `tasks` as of `today`.
    ///
    /// Assignee dashboards never include drafts, whatever the caller passes.
    #[must_use]
    pub fn build(
        owner_id: impl Into<String>,
        kind: DashboardKind,
        tasks: &[Task],
        today: NaiveDate,
    ) -> Self {
        let mut counts = DashboardCounts::default();
        let mut by_priority = PriorityCounts::default();

        let mut summaries: Vec<TaskSummary> = tasks
            .iter()
            .filter(|task| kind == DashboardKind::Assigner || task.status != Status::Draft)
            .map(|task| TaskSummary::from_task(task, today))
            .collect();

        for summary in &summaries {
            counts.record(summary.bucket, summary.overdue);
            if !summary.status.is_terminal() {
                by_priority.record(summary.priority);
            }
        }

        summaries.sort_by(|a, b| {
            a.bucket
                .cmp(&b.bucket)
                .then(a.priority.rank().cmp(&b.priority.rank()))
                .then_with(|| due_order(a.due_date).cmp(&due_order(b.due_date)))
                .then(a.id.cmp(&b.id))
        });

        Self {
            owner_id: owner_id.into(),
            kind,
            as_of: today,
            counts,
            by_priority,
            tasks: summaries,
        }
    }

    /// Rows in `bucket`, in dashboard order.
    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = &TaskSummary> {
        self.tasks.iter().filter(move |t| t.bucket == bucket)
    }
}

/// Undated tasks sort after every dated one.
const fn due_order(due: Option<NaiveDate>) -> (bool, Option<NaiveDate>) {
    (due.is_none(), due)
}
