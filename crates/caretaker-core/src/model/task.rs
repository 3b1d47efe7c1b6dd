use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::session::ActorType;

/// Trade or purpose of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Maintenance,
    Cleaning,
    Gardening,
    Security,
    Inspection,
    Repair,
    Painting,
    Plumbing,
    Electrical,
    General,
    Investigation,
    Report,
    Administrative,
    Other,
}

impl Category {
    pub const ALL: [Self; 14] = [
        Self::Maintenance,
        Self::Cleaning,
        Self::Gardening,
        Self::Security,
        Self::Inspection,
        Self::Repair,
        Self::Painting,
        Self::Plumbing,
        Self::Electrical,
        Self::General,
        Self::Investigation,
        Self::Report,
        Self::Administrative,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Cleaning => "cleaning",
            Self::Gardening => "gardening",
            Self::Security => "security",
            Self::Inspection => "inspection",
            Self::Repair => "repair",
            Self::Painting => "painting",
            Self::Plumbing => "plumbing",
            Self::Electrical => "electrical",
            Self::General => "general",
            Self::Investigation => "investigation",
            Self::Report => "report",
            Self::Administrative => "administrative",
            Self::Other => "other",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Sort rank for dashboards: urgent first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// The eight lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    Assigned,
    Accepted,
    InProgress,
    OnHold,
    PendingReview,
    Completed,
    Cancelled,
}

impl Status {
    pub const ALL: [Self; 8] = [
        Self::Draft,
        Self::Assigned,
        Self::Accepted,
        Self::InProgress,
        Self::OnHold,
        Self::PendingReview,
        Self::Completed,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::PendingReview => "pending_review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `completed` and `cancelled` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The side that owns the move from `self` to `target`, or `None` when the
    /// lifecycle has no such edge.
    ///
    /// Edges:
    /// - `draft -> assigned | cancelled` (assigner)
    /// - `assigned -> accepted` (assignee), `assigned -> cancelled` (assigner)
    /// - `accepted -> in_progress` (assignee)
    /// - `in_progress -> in_progress | on_hold | pending_review | completed` (assignee)
    /// - `on_hold -> in_progress` (assignee)
    /// - `pending_review -> completed | in_progress` (assigner)
    #[must_use]
    pub const fn transition_owner(self, target: Self) -> Option<ActorType> {
        match (self, target) {
            (Self::Draft, Self::Assigned | Self::Cancelled)
            | (Self::Assigned, Self::Cancelled)
            | (Self::PendingReview, Self::Completed | Self::InProgress) => {
                Some(ActorType::Assigner)
            }
            (Self::Assigned, Self::Accepted)
            | (Self::Accepted | Self::OnHold, Self::InProgress)
            | (
                Self::InProgress,
                Self::InProgress | Self::OnHold | Self::PendingReview | Self::Completed,
            ) => Some(ActorType::Assignee),
            _ => None,
        }
    }

    /// Validate a move from `self` to `target`, returning the side that owns it.
    ///
    /// The self-edge on `in_progress` is the progress report; callers must
    /// additionally require a progress value for it.
    pub fn check_transition(self, target: Self) -> Result<ActorType, InvalidTransition> {
        if self.is_terminal() {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "task is closed and accepts no further transitions",
            });
        }

        if self == target && self != Self::InProgress {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        self.transition_owner(target).ok_or(InvalidTransition {
            from: self,
            to: target,
            reason: "transition not allowed by lifecycle rules",
        })
    }
}

/// Which evidence list a photo reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoPhase {
    Before,
    After,
}

impl PhotoPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    #[serde(default)]
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            completed: false,
        }
    }
}

/// The persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub task_number: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub building_name: Option<String>,
    pub unit_number: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub hold_reason: Option<String>,
    pub progress: u8,
    pub before_pictures: Vec<String>,
    pub after_pictures: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
    pub assigner_id: String,
    pub assignee_id: String,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Task {
    /// Due date in the past and still open.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_terminal() && self.due_date.is_some_and(|due| due < today)
    }

    #[must_use]
    pub fn pictures(&self, phase: PhotoPhase) -> &[String] {
        match phase {
            PhotoPhase::Before => &self.before_pictures,
            PhotoPhase::After => &self.after_pictures,
        }
    }
}

/// Fields an assigner supplies when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub assignee_id: String,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub building_name: Option<String>,
    pub unit_number: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub checklist: Vec<ChecklistItem>,
    /// Create as `draft` instead of `assigned`.
    pub draft: bool,
}

/// Human-readable task number for a numeric id.
#[must_use]
pub fn task_number(id: i64) -> String {
    format!("TSK-{id:05}")
}

/// Parse `42`, `TSK-00042`, or `tsk-42` into a numeric id.
#[must_use]
pub fn parse_task_ref(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let digits = trimmed
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("tsk-"))
        .map_or(trimmed, |_| &trimmed[4..]);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Error returned when a status transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move task from {from} to {to}: {reason}")]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PhotoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "category",
                got: s.to_string(),
            })
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "assigned" | "new" => Ok(Self::Assigned),
            "accepted" => Ok(Self::Accepted),
            "in_progress" | "started" => Ok(Self::InProgress),
            "on_hold" | "paused" => Ok(Self::OnHold),
            "pending_review" | "review" => Ok(Self::PendingReview),
            "completed" | "done" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for PhotoPhase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "before" => Ok(Self::Before),
            "after" | "progress" => Ok(Self::After),
            _ => Err(ParseEnumError {
                expected: "photo phase",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActorType, Category, InvalidTransition, Priority, Status, Task, parse_task_ref,
        task_number,
    };
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn enum_json_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&Status::PendingReview).unwrap(),
            "\"pending_review\""
        );
        assert_eq!(
            serde_json::to_string(&Category::Administrative).unwrap(),
            "\"administrative\""
        );
        assert_eq!(
            serde_json::from_str::<Priority>("\"urgent\"").unwrap(),
            Priority::Urgent
        );
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in Status::ALL {
            assert_eq!(Status::from_str(&value.to_string()).unwrap(), value);
        }
        for value in Category::ALL {
            assert_eq!(Category::from_str(&value.to_string()).unwrap(), value);
        }
        for value in Priority::ALL {
            assert_eq!(Priority::from_str(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn parse_accepts_dashes_and_aliases() {
        assert_eq!(Status::from_str("in-progress").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("On Hold").unwrap(), Status::OnHold);
        assert_eq!(Status::from_str("done").unwrap(), Status::Completed);
        assert!(Status::from_str("active").is_err());
        assert!(Category::from_str("roofing").is_err());
        assert!(Priority::from_str("critical").is_err());
    }

    #[test]
    fn transition_table_owners() {
        use ActorType::{Assignee, Assigner};
        let allowed = [
            (Status::Draft, Status::Assigned, Assigner),
            (Status::Draft, Status::Cancelled, Assigner),
            (Status::Assigned, Status::Accepted, Assignee),
            (Status::Assigned, Status::Cancelled, Assigner),
            (Status::Accepted, Status::InProgress, Assignee),
            (Status::InProgress, Status::OnHold, Assignee),
            (Status::InProgress, Status::PendingReview, Assignee),
            (Status::InProgress, Status::Completed, Assignee),
            (Status::InProgress, Status::InProgress, Assignee),
            (Status::OnHold, Status::InProgress, Assignee),
            (Status::PendingReview, Status::Completed, Assigner),
            (Status::PendingReview, Status::InProgress, Assigner),
        ];
        for (from, to, owner) in allowed {
            assert_eq!(from.check_transition(to), Ok(owner), "{from} -> {to}");
        }
    }

    #[test]
    fn non_adjacent_moves_are_rejected() {
        assert!(matches!(
            Status::Assigned.check_transition(Status::InProgress),
            Err(InvalidTransition {
                from: Status::Assigned,
                to: Status::InProgress,
                ..
            })
        ));
        assert!(Status::Accepted.check_transition(Status::Completed).is_err());
        assert!(Status::OnHold.check_transition(Status::Completed).is_err());
        assert!(Status::Accepted.check_transition(Status::Accepted).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        for from in [Status::Completed, Status::Cancelled] {
            for to in Status::ALL {
                assert!(from.check_transition(to).is_err(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn task_numbers_parse_back() {
        assert_eq!(task_number(42), "TSK-00042");
        assert_eq!(task_number(123_456), "TSK-123456");
        assert_eq!(parse_task_ref("TSK-00042"), Some(42));
        assert_eq!(parse_task_ref("tsk-7"), Some(7));
        assert_eq!(parse_task_ref(" 19 "), Some(19));
        assert_eq!(parse_task_ref("TSK-"), None);
        assert_eq!(parse_task_ref("0"), None);
        assert_eq!(parse_task_ref("abc"), None);
    }

    #[test]
    fn overdue_ignores_closed_and_undated_tasks() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let mut task = Task {
            id: 1,
            task_number: task_number(1),
            title: "Replace lobby bulbs".into(),
            description: String::new(),
            category: Category::Electrical,
            priority: Priority::Low,
            status: Status::InProgress,
            due_date: Some(yesterday),
            estimated_hours: None,
            actual_hours: None,
            building_name: None,
            unit_number: None,
            location: None,
            notes: None,
            findings: None,
            recommendations: None,
            hold_reason: None,
            progress: 0,
            before_pictures: vec![],
            after_pictures: vec![],
            checklist: vec![],
            assigner_id: "pm-1".into(),
            assignee_id: "staff-1".into(),
            created_at_us: 0,
            updated_at_us: 0,
        };
        assert!(task.is_overdue(today));
        assert!(!task.is_overdue(yesterday));

        task.status = Status::Completed;
        assert!(!task.is_overdue(today));

        task.status = Status::Assigned;
        task.due_date = None;
        assert!(!task.is_overdue(today));
    }
}
