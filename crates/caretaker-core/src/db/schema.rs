//! Canonical SQLite schema for the task store.
//!
//! - `tasks` keeps the current record for each task
//! - `task_photos` and `task_checklist` hold the ordered multi-valued fields
//! - `task_updates` and `task_comments` are append-only logs
//! - `read_model_epochs` versions dashboard scopes for pollers
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    task_id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL CHECK (category IN (
        'maintenance', 'cleaning', 'gardening', 'security', 'inspection',
        'repair', 'painting', 'plumbing', 'electrical', 'general',
        'investigation', 'report', 'administrative', 'other'
    )),
    priority TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
    status TEXT NOT NULL CHECK (status IN (
        'draft', 'assigned', 'accepted', 'in_progress', 'on_hold',
        'pending_review', 'completed', 'cancelled'
    )),
    due_date TEXT,
    estimated_hours REAL CHECK (estimated_hours IS NULL OR estimated_hours >= 0),
    actual_hours REAL CHECK (actual_hours IS NULL OR actual_hours >= 0),
    building_name TEXT,
    unit_number TEXT,
    location TEXT,
    notes TEXT,
    findings TEXT,
    recommendations TEXT,
    hold_reason TEXT,
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    assigner_id TEXT NOT NULL CHECK (length(trim(assigner_id)) > 0),
    assignee_id TEXT NOT NULL CHECK (length(trim(assignee_id)) > 0),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_photos (
    task_id INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    phase TEXT NOT NULL CHECK (phase IN ('before', 'after')),
    position INTEGER NOT NULL,
    reference TEXT NOT NULL CHECK (length(trim(reference)) > 0),
    added_at_us INTEGER NOT NULL,
    PRIMARY KEY (task_id, phase, position)
);

CREATE TABLE IF NOT EXISTS task_checklist (
    task_id INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    item TEXT NOT NULL CHECK (length(trim(item)) > 0),
    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
    PRIMARY KEY (task_id, position)
);

CREATE TABLE IF NOT EXISTS task_updates (
    update_id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    actor_id TEXT NOT NULL,
    actor_type TEXT NOT NULL CHECK (actor_type IN ('assignee', 'assigner')),
    status TEXT NOT NULL,
    progress INTEGER CHECK (progress IS NULL OR progress BETWEEN 0 AND 100),
    message TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    author_id TEXT NOT NULL,
    author_type TEXT NOT NULL CHECK (author_type IN ('assignee', 'assigner')),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: dashboard indexes and read-model epochs.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_tasks_assignee_status
    ON tasks(assignee_id, status, priority);

CREATE INDEX IF NOT EXISTS idx_tasks_assigner_status
    ON tasks(assigner_id, status, priority);

CREATE INDEX IF NOT EXISTS idx_tasks_due_date
    ON tasks(due_date);

CREATE INDEX IF NOT EXISTS idx_task_updates_task_created
    ON task_updates(task_id, created_at_us, update_id);

CREATE INDEX IF NOT EXISTS idx_task_comments_task_created
    ON task_comments(task_id, created_at_us, comment_id);

CREATE TABLE IF NOT EXISTS read_model_epochs (
    scope TEXT PRIMARY KEY,
    epoch INTEGER NOT NULL DEFAULT 0,
    bumped_at_us INTEGER NOT NULL
);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by dashboard and detail query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_tasks_assignee_status",
    "idx_tasks_assigner_status",
    "idx_tasks_due_date",
    "idx_task_updates_task_created",
    "idx_task_comments_task_created",
];
