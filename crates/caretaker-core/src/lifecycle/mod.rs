//! Task lifecycle operations.
//!
//! Every mutation runs in one `IMMEDIATE` transaction: the task is read,
//! validated against the lifecycle, written, logged, and its read-model
//! epochs are bumped before commit. A rejected request rolls back and leaves
//! the stored row untouched.

pub mod transition;
pub mod validate;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dashboard::{Dashboard, DashboardKind, TaskDetail};
use crate::db::query::{self, TaskFilter, UpdateRecord};
use crate::error::CaretakerError;
use crate::model::log::TaskComment;
use crate::model::session::{ActorType, Session};
use crate::model::task::{ChecklistItem, NewTask, PhotoPhase, Status, Task};
use crate::refresh::{self, Scope};
use crate::storage::ObjectStore;

pub use transition::{StatusChange, TransitionPlan, clamp_progress, plan_transition};

const CREATED_MESSAGE: &str = "Task created";

/// Write and read operations over one task store.
pub struct Lifecycle<'a> {
    conn: &'a mut Connection,
    clock: &'a dyn Clock,
}

impl<'a> Lifecycle<'a> {
    pub fn new(conn: &'a mut Connection, clock: &'a dyn Clock) -> Self {
        Self { conn, clock }
    }

    fn begin(&mut self) -> Result<Transaction<'_>, CaretakerError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Create a task as `assigned`, or `draft` when requested.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::Forbidden`] for roles that cannot assign work.
    /// - [`CaretakerError::Validation`] for malformed fields.
    pub fn create_task(&mut self, session: &Session, new: &NewTask) -> Result<Task, CaretakerError> {
        session.require_assigner_role("create tasks")?;
        validate::new_task(new)?;

        let mut normalized = new.clone();
        normalized.title = new.title.trim().to_string();
        let status = if new.draft {
            Status::Draft
        } else {
            Status::Assigned
        };

        let now = self.clock.now_us();
        let tx = self.begin()?;
        let task_id = query::insert_task(&tx, &normalized, &session.user_id, status, now)?;
        query::insert_update(
            &tx,
            &UpdateRecord {
                task_id,
                actor_id: &session.user_id,
                actor_type: ActorType::Assigner,
                status,
                progress: None,
                message: Some(CREATED_MESSAGE),
                created_at_us: now,
            },
        )?;
        let task = load(&tx, task_id)?;
        refresh::invalidate(&tx, &task, now)?;
        tx.commit()?;

        info!(
            task_id,
            task = %task.task_number,
            status = %status,
            assignee = %task.assignee_id,
            assigner = %task.assigner_id,
            "task created"
        );
        Ok(task)
    }

    /// Apply a status change.
    ///
    /// Supplied photo references are appended to the stored lists before the
    /// row is saved; findings, recommendations, and actual hours are stored
    /// when present.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    /// - [`CaretakerError::Forbidden`] for strangers and wrong-side requests.
    /// - [`CaretakerError::InvalidTransition`] for moves the lifecycle rejects.
    /// - [`CaretakerError::Validation`] for malformed fields.
    pub fn update_status(
        &mut self,
        session: &Session,
        task_id: i64,
        change: &StatusChange,
    ) -> Result<Task, CaretakerError> {
        let now = self.clock.now_us();
        let tx = self.begin()?;
        let mut task = load(&tx, task_id)?;
        let side = session.side_for(&task)?;

        let plan = plan_transition(&task, side, change).inspect_err(|err| {
            warn!(
                task_id,
                from = %task.status,
                requested = ?change.status,
                actor = %session.user_id,
                error = %err,
                "status change rejected"
            );
        })?;

        query::append_photos(&tx, task_id, PhotoPhase::Before, &change.before_pictures, now)?;
        query::append_photos(&tx, task_id, PhotoPhase::After, &change.after_pictures, now)?;

        task.status = plan.to;
        task.progress = plan.progress;
        task.hold_reason.clone_from(&plan.hold_reason);
        if let Some(findings) = trimmed(change.findings.as_deref()) {
            task.findings = Some(findings);
        }
        if let Some(recommendations) = trimmed(change.recommendations.as_deref()) {
            task.recommendations = Some(recommendations);
        }
        if change.actual_hours.is_some() {
            task.actual_hours = change.actual_hours;
        }
        task.updated_at_us = now;
        query::save_task(&tx, &task)?;

        query::insert_update(
            &tx,
            &UpdateRecord {
                task_id,
                actor_id: &session.user_id,
                actor_type: plan.side,
                status: plan.to,
                progress: plan.logged_progress,
                message: Some(&plan.message),
                created_at_us: now,
            },
        )?;
        refresh::invalidate(&tx, &task, now)?;
        let task = load(&tx, task_id)?;
        tx.commit()?;

        info!(
            task_id,
            from = %plan.from,
            to = %plan.to,
            progress = plan.progress,
            actor = %session.user_id,
            side = %plan.side,
            "task status changed"
        );
        Ok(task)
    }

    /// Append a comment. Status is unaffected.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    /// - [`CaretakerError::Forbidden`] for callers unrelated to the task.
    /// - [`CaretakerError::Validation`] for an empty or malformed body.
    pub fn add_comment(
        &mut self,
        session: &Session,
        task_id: i64,
        body: &str,
    ) -> Result<TaskComment, CaretakerError> {
        validate::comment_body(body)?;

        let now = self.clock.now_us();
        let tx = self.begin()?;
        let task = load(&tx, task_id)?;
        let side = session.side_for(&task)?;

        let comment_id =
            query::insert_comment(&tx, task_id, &session.user_id, side, body, now)?;
        query::bump_epoch(&tx, &Scope::Task(task_id).key(), now)?;
        tx.commit()?;

        info!(task_id, comment_id, author = %session.user_id, side = %side, "comment added");
        Ok(TaskComment {
            comment_id,
            task_id,
            author_id: session.user_id.clone(),
            author_type: side,
            body: body.to_string(),
            created_at_us: now,
        })
    }

    /// Replace the checklist wholesale, regardless of status.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    /// - [`CaretakerError::Forbidden`] for callers unrelated to the task.
    /// - [`CaretakerError::Validation`] for blank items.
    pub fn update_checklist(
        &mut self,
        session: &Session,
        task_id: i64,
        items: &[ChecklistItem],
    ) -> Result<Task, CaretakerError> {
        validate::checklist(items)?;

        let now = self.clock.now_us();
        let tx = self.begin()?;
        let mut task = load(&tx, task_id)?;
        let side = session.side_for(&task)?;

        let normalized: Vec<ChecklistItem> = items
            .iter()
            .map(|entry| ChecklistItem {
                item: entry.item.trim().to_string(),
                completed: entry.completed,
            })
            .collect();
        query::replace_checklist(&tx, task_id, &normalized)?;
        task.updated_at_us = now;
        query::save_task(&tx, &task)?;
        refresh::invalidate(&tx, &task, now)?;
        let task = load(&tx, task_id)?;
        tx.commit()?;

        let done = task.checklist.iter().filter(|i| i.completed).count();
        info!(
            task_id,
            items = task.checklist.len(),
            done,
            side = %side,
            "checklist replaced"
        );
        Ok(task)
    }

    /// Set or clear the assigner's notes.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    /// - [`CaretakerError::Forbidden`] unless the caller acts on the assigner side.
    pub fn update_notes(
        &mut self,
        session: &Session,
        task_id: i64,
        notes: Option<&str>,
    ) -> Result<Task, CaretakerError> {
        let now = self.clock.now_us();
        let tx = self.begin()?;
        let mut task = load(&tx, task_id)?;
        if session.side_for(&task)? != ActorType::Assigner {
            return Err(CaretakerError::forbidden(format!(
                "only the assigner may edit notes on {}",
                task.task_number
            )));
        }

        task.notes = trimmed(notes);
        task.updated_at_us = now;
        query::save_task(&tx, &task)?;
        refresh::invalidate(&tx, &task, now)?;
        tx.commit()?;

        info!(task_id, cleared = task.notes.is_none(), "notes updated");
        Ok(task)
    }

    /// Delete a task and its history, then remove its photos from `objects`.
    ///
    /// Photos still listed by another task stay in `objects`. The record
    /// deletion commits first. Object cleanup is best-effort:
    /// failures are logged and do not fail the call.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::Forbidden`] for non-admin roles.
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    pub fn delete_task(
        &mut self,
        session: &Session,
        task_id: i64,
        objects: &dyn ObjectStore,
    ) -> Result<Task, CaretakerError> {
        if !session.role.can_delete() {
            return Err(CaretakerError::forbidden(format!(
                "role {} may not delete tasks",
                session.role
            )));
        }

        let now = self.clock.now_us();
        let tx = self.begin()?;
        let task = load(&tx, task_id)?;
        query::delete_task(&tx, task_id)?;
        refresh::invalidate(&tx, &task, now)?;

        // Identical bytes share one object; keep any still listed by another task.
        let mut orphaned: Vec<&String> = Vec::new();
        for reference in task.before_pictures.iter().chain(&task.after_pictures) {
            if orphaned.contains(&reference) {
                continue;
            }
            if query::photo_is_referenced(&tx, reference)? {
                debug!(task_id, reference = %reference, "photo shared with another task; kept");
            } else {
                orphaned.push(reference);
            }
        }
        tx.commit()?;

        info!(
            task_id,
            task = %task.task_number,
            actor = %session.user_id,
            released = orphaned.len(),
            "task deleted"
        );

        for reference in orphaned {
            if let Err(err) = objects.delete(reference) {
                warn!(task_id, reference = %reference, error = %err, "photo cleanup failed");
            }
        }
        Ok(task)
    }

    /// Task with its updates and comments, oldest first.
    ///
    /// # Errors
    ///
    /// - [`CaretakerError::NotFound`] when the task does not exist.
    /// - [`CaretakerError::Forbidden`] for callers unrelated to the task.
    pub fn get_task_detail(
        &mut self,
        session: &Session,
        task_id: i64,
    ) -> Result<TaskDetail, CaretakerError> {
        let today = self.clock.today();
        let tx = self.conn.transaction()?;
        let task = load(&tx, task_id)?;
        session.side_for(&task)?;
        let updates = query::list_updates(&tx, task_id)?;
        let comments = query::list_comments(&tx, task_id)?;
        drop(tx);

        debug!(task_id, updates = updates.len(), comments = comments.len(), "loaded task detail");
        Ok(TaskDetail {
            overdue: task.is_overdue(today),
            task,
            updates,
            comments,
        })
    }

    /// Dashboard of work assigned to `assignee_id`. Drafts are never shown.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Forbidden`] unless the caller is the assignee
    /// or holds an assigning role.
    pub fn list_tasks_for_assignee(
        &mut self,
        session: &Session,
        assignee_id: &str,
    ) -> Result<Dashboard, CaretakerError> {
        if session.user_id != assignee_id && !session.role.can_assign() {
            return Err(CaretakerError::forbidden(format!(
                "{} may not view the dashboard of {assignee_id}",
                session.user_id
            )));
        }

        let filter = TaskFilter {
            assignee_id: Some(assignee_id.to_string()),
            ..TaskFilter::default()
        };
        self.dashboard(assignee_id, DashboardKind::Assignee, &filter)
    }

    /// Dashboard of work created by `assigner_id`, drafts included.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Forbidden`] unless the caller is that assigner
    /// (with an assigning role) or an administrator.
    pub fn list_tasks_for_assigner(
        &mut self,
        session: &Session,
        assigner_id: &str,
    ) -> Result<Dashboard, CaretakerError> {
        let own = session.user_id == assigner_id && session.role.can_assign();
        if !own && !session.role.is_admin() {
            return Err(CaretakerError::forbidden(format!(
                "{} may not view the dashboard of {assigner_id}",
                session.user_id
            )));
        }

        let filter = TaskFilter {
            assigner_id: Some(assigner_id.to_string()),
            include_drafts: true,
            ..TaskFilter::default()
        };
        self.dashboard(assigner_id, DashboardKind::Assigner, &filter)
    }

    fn dashboard(
        &mut self,
        owner_id: &str,
        kind: DashboardKind,
        filter: &TaskFilter,
    ) -> Result<Dashboard, CaretakerError> {
        let today = self.clock.today();
        let tasks = query::list_tasks(self.conn, filter)?;
        let board = Dashboard::build(owner_id, kind, &tasks, today);
        debug!(owner = owner_id, total = board.counts.total, "built dashboard");
        Ok(board)
    }
}

fn load(conn: &Connection, task_id: i64) -> Result<Task, CaretakerError> {
    query::get_task(conn, task_id)?.ok_or_else(|| CaretakerError::task_not_found(task_id))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::{Lifecycle, StatusChange};
    use crate::clock::FixedClock;
    use crate::db::{open_in_memory, query};
    use crate::error::ErrorCode;
    use crate::model::session::{ActorType, Role, Session};
    use crate::model::task::{ChecklistItem, NewTask, Status};
    use crate::storage::{ObjectStore, StorageError};
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::cell::RefCell;

    fn clock() -> FixedClock {
        FixedClock::on(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
    }

    fn manager() -> Session {
        Session::new("pm-1", Role::PropertyManager)
    }

    fn staff() -> Session {
        Session::new("staff-1", Role::Staff)
    }

    fn new_task() -> NewTask {
        NewTask {
            title: "Fix leaking tap".into(),
            description: "Unit 4B kitchen".into(),
            assignee_id: "staff-1".into(),
            checklist: vec![ChecklistItem::new("Isolate supply")],
            ..NewTask::default()
        }
    }

    fn status_of(conn: &Connection, id: i64) -> Status {
        query::get_task(conn, id).unwrap().unwrap().status
    }

    #[test]
    fn create_logs_initial_update() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let task = lc.create_task(&manager(), &new_task()).unwrap();
        assert_eq!(task.status, Status::Assigned);
        assert_eq!(task.assigner_id, "pm-1");

        let updates = query::list_updates(&conn, task.id).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, Status::Assigned);
        assert_eq!(updates[0].actor_type, ActorType::Assigner);
        assert_eq!(updates[0].message.as_deref(), Some("Task created"));
    }

    #[test]
    fn staff_cannot_create() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let err = Lifecycle::new(&mut conn, &clock)
            .create_task(&staff(), &new_task())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn rejected_change_leaves_row_and_log_untouched() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;

        let err = lc
            .update_status(&staff(), id, &StatusChange::to(Status::InProgress).with_before("obj:a.jpg"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

        assert_eq!(status_of(&conn, id), Status::Assigned);
        assert_eq!(query::list_updates(&conn, id).unwrap().len(), 1);
        assert!(
            query::get_task(&conn, id)
                .unwrap()
                .unwrap()
                .before_pictures
                .is_empty(),
            "photos from a rejected change must not persist"
        );
    }

    #[test]
    fn wrong_side_and_strangers_are_forbidden() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;

        let err = lc
            .update_status(&manager(), id, &StatusChange::to(Status::Accepted))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let stranger = Session::new("staff-2", Role::Staff);
        let err = lc.add_comment(&stranger, id, "hello").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn missing_task_is_not_found() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let err = lc.add_comment(&staff(), 99, "anyone there?").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
        let err = lc
            .update_status(&staff(), 99, &StatusChange::to(Status::Accepted))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
    }

    #[test]
    fn status_change_bumps_epochs() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;
        lc.update_status(&staff(), id, &StatusChange::to(Status::Accepted))
            .unwrap();

        assert_eq!(query::read_epoch(&conn, &format!("task:{id}")).unwrap(), 2);
        assert_eq!(query::read_epoch(&conn, "assignee:staff-1").unwrap(), 2);
        assert_eq!(query::read_epoch(&conn, "assigner:pm-1").unwrap(), 2);
    }

    #[test]
    fn notes_are_assigner_only() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;

        let task = lc
            .update_notes(&manager(), id, Some("  Key at reception "))
            .unwrap();
        assert_eq!(task.notes.as_deref(), Some("Key at reception"));

        let err = lc.update_notes(&staff(), id, Some("mine")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn checklist_replacement_ignores_status() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;
        lc.update_status(&manager(), id, &StatusChange::to(Status::Cancelled))
            .unwrap();

        let items = vec![
            ChecklistItem {
                item: "Isolate supply".into(),
                completed: true,
            },
            ChecklistItem::new("Replace washer"),
        ];
        let task = lc.update_checklist(&staff(), id, &items).unwrap();
        assert_eq!(task.checklist, items);
        assert_eq!(task.status, Status::Cancelled);
    }

    #[test]
    fn detail_orders_history_oldest_first() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;
        lc.update_status(&staff(), id, &StatusChange::to(Status::Accepted))
            .unwrap();
        lc.add_comment(&staff(), id, "first").unwrap();
        lc.add_comment(&manager(), id, "second").unwrap();

        let detail = lc.get_task_detail(&staff(), id).unwrap();
        let statuses: Vec<Status> = detail.updates.iter().map(|u| u.status).collect();
        assert_eq!(statuses, vec![Status::Assigned, Status::Accepted]);
        let bodies: Vec<&str> = detail.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(detail.comments[1].author_type, ActorType::Assigner);
    }

    #[test]
    fn drafts_hidden_from_assignee_until_published() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let draft = NewTask {
            draft: true,
            ..new_task()
        };
        let id = lc.create_task(&manager(), &draft).unwrap().id;

        assert_eq!(lc.list_tasks_for_assignee(&staff(), "staff-1").unwrap().counts.total, 0);
        let board = lc.list_tasks_for_assigner(&manager(), "pm-1").unwrap();
        assert_eq!(board.counts.drafts, 1);

        lc.update_status(&manager(), id, &StatusChange::to(Status::Assigned))
            .unwrap();
        let board = lc.list_tasks_for_assignee(&staff(), "staff-1").unwrap();
        assert_eq!(board.counts.new_tasks, 1);
    }

    #[test]
    fn dashboards_enforce_viewer() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let other = Session::new("staff-2", Role::Staff);
        assert_eq!(
            lc.list_tasks_for_assignee(&other, "staff-1").unwrap_err().code(),
            ErrorCode::Forbidden
        );
        assert!(lc.list_tasks_for_assignee(&manager(), "staff-1").is_ok());
        assert_eq!(
            lc.list_tasks_for_assigner(&manager(), "pm-2").unwrap_err().code(),
            ErrorCode::Forbidden
        );
        let admin = Session::new("admin-1", Role::JuniorAdmin);
        assert!(lc.list_tasks_for_assigner(&admin, "pm-2").is_ok());
    }

    struct FailingStore {
        attempts: RefCell<Vec<String>>,
    }

    impl ObjectStore for FailingStore {
        fn put(&self, _bytes: &[u8], _extension: &str) -> Result<String, StorageError> {
            Err(StorageError::NotFound("unsupported".into()))
        }

        fn get(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(reference.into()))
        }

        fn delete(&self, reference: &str) -> Result<(), StorageError> {
            self.attempts.borrow_mut().push(reference.to_string());
            Err(StorageError::Io {
                path: reference.into(),
                source: std::io::Error::other("bucket unavailable"),
            })
        }
    }

    #[test]
    fn delete_swallows_storage_failures() {
        let mut conn = open_in_memory().unwrap();
        let clock = clock();
        let mut lc = Lifecycle::new(&mut conn, &clock);
        let id = lc.create_task(&manager(), &new_task()).unwrap().id;
        lc.update_status(&staff(), id, &StatusChange::to(Status::Accepted))
            .unwrap();
        lc.update_status(
            &staff(),
            id,
            &StatusChange::to(Status::InProgress).with_before("obj:before.jpg"),
        )
        .unwrap();

        let err = lc
            .delete_task(&manager(), id, &FailingStore { attempts: RefCell::default() })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let store = FailingStore {
            attempts: RefCell::default(),
        };
        let admin = Session::new("admin-1", Role::SeniorAdmin);
        lc.delete_task(&admin, id, &store).unwrap();

        assert_eq!(*store.attempts.borrow(), vec!["obj:before.jpg".to_string()]);
        assert!(query::get_task(&conn, id).unwrap().is_none());
        assert!(query::list_updates(&conn, id).unwrap().is_empty());
    }
}
