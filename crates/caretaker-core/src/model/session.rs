//! Explicit per-request caller identity.
//!
//! Every lifecycle and dashboard operation receives a [`Session`]; nothing
//! reads identity from process-wide state.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::task::{ParseEnumError, Task};
use crate::error::CaretakerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SeniorAdmin,
    JuniorAdmin,
    PropertyManager,
    Contractor,
    Artisan,
    Staff,
    Customer,
}

impl Role {
    pub const ALL: [Self; 7] = [
        Self::SeniorAdmin,
        Self::JuniorAdmin,
        Self::PropertyManager,
        Self::Contractor,
        Self::Artisan,
        Self::Staff,
        Self::Customer,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeniorAdmin => "senior_admin",
            Self::JuniorAdmin => "junior_admin",
            Self::PropertyManager => "property_manager",
            Self::Contractor => "contractor",
            Self::Artisan => "artisan",
            Self::Staff => "staff",
            Self::Customer => "customer",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::SeniorAdmin | Self::JuniorAdmin)
    }

    /// Roles allowed to create, review, and cancel tasks.
    #[must_use]
    pub const fn can_assign(self) -> bool {
        self.is_admin() || matches!(self, Self::PropertyManager)
    }

    /// Roles allowed to destroy task records.
    #[must_use]
    pub const fn can_delete(self) -> bool {
        self.is_admin()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "role",
                got: s.to_string(),
            })
    }
}

/// The side of a task a request acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Assignee,
    Assigner,
}

impl ActorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assignee => "assignee",
            Self::Assigner => "assigner",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assignee" => Ok(Self::Assignee),
            "assigner" => Ok(Self::Assigner),
            _ => Err(ParseEnumError {
                expected: "actor type",
                got: s.to_string(),
            }),
        }
    }
}

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Classify this caller relative to `task`.
    ///
    /// Parties act on their own side; supervising roles that are not a party
    /// act on the assigner side.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Forbidden`] for callers with no relation to the task.
    pub fn side_for(&self, task: &Task) -> Result<ActorType, CaretakerError> {
        if self.user_id == task.assignee_id {
            Ok(ActorType::Assignee)
        } else if self.user_id == task.assigner_id || self.role.can_assign() {
            Ok(ActorType::Assigner)
        } else {
            Err(CaretakerError::forbidden(format!(
                "{} '{}' is not a party to {}",
                self.role, self.user_id, task.task_number
            )))
        }
    }

    /// Require an assigning role.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Forbidden`] when the role cannot assign work.
    pub fn require_assigner_role(&self, action: &str) -> Result<(), CaretakerError> {
        if self.role.can_assign() {
            Ok(())
        } else {
            Err(CaretakerError::forbidden(format!(
                "role {} may not {action}",
                self.role
            )))
        }
    }
}
