//! caretaker-core library.
//!
//! Task lifecycle for facility staff: a status state machine with evidence
//! rules, append-only update and comment logs, and dashboard read models,
//! all over an embedded SQLite store.
//!
//! # Conventions
//!
//! - **Errors**: lifecycle operations return [`error::CaretakerError`];
//!   store plumbing and config loading use `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!` for accepted mutations,
//!   `warn!` for rejections and swallowed failures, `debug!` for reads).
//! - **Identity**: every operation takes an explicit
//!   [`model::session::Session`].

pub mod auth;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod refresh;
pub mod retry;
pub mod storage;
