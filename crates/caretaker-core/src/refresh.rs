//! Scheduled refresh for polling readers.
//!
//! Writers bump a per-scope epoch in the same transaction as the mutation
//! (see [`crate::lifecycle`]). A [`RefreshSchedule`] remembers the last epoch
//! it rendered and reports a change only when the stored epoch moved.

use rusqlite::Connection;
use std::fmt;
use std::time::Duration;

use crate::db::query;
use crate::model::task::Task;

/// A read-model scope whose epoch is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Task(i64),
    Assignee(String),
    Assigner(String),
}

impl Scope {
    /// Every scope a mutation of `task` invalidates.
    #[must_use]
    pub fn for_task(task: &Task) -> [Self; 3] {
        [
            Self::Task(task.id),
            Self::Assignee(task.assignee_id.clone()),
            Self::Assigner(task.assigner_id.clone()),
        ]
    }

    /// Storage key, e.g. `task:42` or `assignee:staff-1`.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task:{id}"),
            Self::Assignee(user) => write!(f, "assignee:{user}"),
            Self::Assigner(user) => write!(f, "assigner:{user}"),
        }
    }
}

/// Bump the epoch of every scope `task` belongs to.
///
/// # Errors
///
/// Returns an error if an upsert fails.
pub fn invalidate(conn: &Connection, task: &Task, now_us: i64) -> rusqlite::Result<()> {
    for scope in Scope::for_task(task) {
        query::bump_epoch(conn, &scope.key(), now_us)?;
    }
    Ok(())
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// First observation, or the epoch moved since the last one.
    Changed { epoch: u64 },
    Unchanged,
}

impl Poll {
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Fixed-interval poller for one scope.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    scope: Scope,
    interval: Duration,
    seen: Option<u64>,
}

impl RefreshSchedule {
    #[must_use]
    pub const fn new(scope: Scope, interval: Duration) -> Self {
        Self {
            scope,
            interval,
            seen: None,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Record `epoch` and report whether it differs from the last one seen.
    pub fn observe(&mut self, epoch: u64) -> Poll {
        if self.seen == Some(epoch) {
            Poll::Unchanged
        } else {
            self.seen = Some(epoch);
            Poll::Changed { epoch }
        }
    }

    /// Read the scope's epoch from the store and [`observe`](Self::observe) it.
    ///
    /// # Errors
    ///
    /// Returns an error if the epoch query fails.
    pub fn poll(&mut self, conn: &Connection) -> rusqlite::Result<Poll> {
        let epoch = query::read_epoch(conn, &self.scope.key())?;
        let poll = self.observe(epoch);
        tracing::debug!(scope = %self.scope, epoch, changed = poll.is_changed(), "polled read model");
        Ok(poll)
    }
}
