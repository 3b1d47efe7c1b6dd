#![allow(dead_code)]

use caretaker_core::db::query;
use caretaker_core::lifecycle::StatusChange;
use caretaker_core::model::session::{ActorType, Role, Session};
use caretaker_core::model::task::{NewTask, PhotoPhase, Priority, Status};
use chrono::NaiveDate;
use proptest::prelude::*;
use rusqlite::Connection;

pub const ASSIGNER: &str = "pm-1";
pub const ASSIGNEE: &str = "staff-1";

pub fn assigner() -> Session {
    Session::new(ASSIGNER, Role::PropertyManager)
}

pub fn assignee() -> Session {
    Session::new(ASSIGNEE, Role::Staff)
}

pub fn arb_status() -> impl Strategy<Value = Status> + Clone {
    prop::sample::select(Status::ALL.to_vec())
}

pub fn arb_open_status() -> impl Strategy<Value = Status> + Clone {
    prop::sample::select(
        Status::ALL
            .into_iter()
            .filter(|s| !s.is_terminal())
            .collect::<Vec<_>>(),
    )
}

pub fn arb_priority() -> impl Strategy<Value = Priority> + Clone {
    prop::sample::select(Priority::ALL.to_vec())
}

pub fn arb_side() -> impl Strategy<Value = ActorType> + Clone {
    prop_oneof![Just(ActorType::Assignee), Just(ActorType::Assigner)]
}

/// Due dates around 2026-06-15, or none.
pub fn arb_due() -> impl Strategy<Value = Option<NaiveDate>> + Clone {
    prop::option::of((1u32..=28).prop_map(|d| {
        NaiveDate::from_ymd_opt(2026, 6, d).expect("valid June date")
    }))
}

/// A status change request as a client would send it.
#[derive(Debug, Clone)]
pub struct Request {
    pub status: Status,
    pub side: ActorType,
    pub progress: Option<i64>,
    pub before: usize,
    pub after: usize,
}

impl Request {
    pub fn session(&self) -> Session {
        match self.side {
            ActorType::Assignee => assignee(),
            ActorType::Assigner => assigner(),
        }
    }

    pub fn change(&self) -> StatusChange {
        StatusChange {
            status: Some(self.status),
            progress_percentage: self.progress,
            before_pictures: photo_refs("req-before", self.before),
            after_pictures: photo_refs("req-after", self.after),
            ..StatusChange::default()
        }
    }
}

pub fn arb_request() -> impl Strategy<Value = Request> + Clone {
    (
        arb_status(),
        arb_side(),
        prop::option::of(-20i64..140),
        0usize..3,
        0usize..3,
    )
        .prop_map(|(status, side, progress, before, after)| Request {
            status,
            side,
            progress,
            before,
            after,
        })
}

/// A stored task row description for dashboard tests.
#[derive(Debug, Clone)]
pub struct TaskSeed {
    pub status: Status,
    pub priority: Priority,
    pub due: Option<NaiveDate>,
}

pub fn arb_task_seed() -> impl Strategy<Value = TaskSeed> + Clone {
    (arb_status(), arb_priority(), arb_due()).prop_map(|(status, priority, due)| TaskSeed {
        status,
        priority,
        due,
    })
}

pub fn photo_refs(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("obj:{prefix}-{i}.jpg")).collect()
}

/// Insert a task directly in `status` with the given photo counts.
pub fn seed_task(conn: &Connection, status: Status, before: usize, after: usize) -> i64 {
    seed_task_with(
        conn,
        &TaskSeed {
            status,
            priority: Priority::Medium,
            due: None,
        },
        before,
        after,
    )
}

pub fn seed_task_with(conn: &Connection, seed: &TaskSeed, before: usize, after: usize) -> i64 {
    let new = NewTask {
        title: format!("Seeded {} task", seed.status),
        priority: seed.priority,
        due_date: seed.due,
        assignee_id: ASSIGNEE.into(),
        ..NewTask::default()
    };
    let id = query::insert_task(conn, &new, ASSIGNER, seed.status, 1).expect("insert seed task");
    query::append_photos(conn, id, PhotoPhase::Before, &photo_refs("before", before), 1)
        .expect("seed before photos");
    query::append_photos(conn, id, PhotoPhase::After, &photo_refs("after", after), 1)
        .expect("seed after photos");
    id
}

pub fn stored_status(conn: &Connection, id: i64) -> Status {
    query::get_task(conn, id)
        .expect("query task")
        .expect("task exists")
        .status
}

pub fn update_count(conn: &Connection, id: i64) -> usize {
    query::list_updates(conn, id).expect("list updates").len()
}
