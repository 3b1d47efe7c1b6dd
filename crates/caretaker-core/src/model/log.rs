use serde::{Deserialize, Serialize};

use super::session::ActorType;
use super::task::Status;

/// One accepted status change. Rows are never updated or deleted except by
/// cascading task deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub update_id: i64,
    pub task_id: i64,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub status: Status,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub created_at_us: i64,
}

/// Free-text message attached to a task, independent of status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    pub comment_id: i64,
    pub task_id: i64,
    pub author_id: String,
    pub author_type: ActorType,
    pub body: String,
    pub created_at_us: i64,
}
