//! Locating and opening the `.caretaker/` project for a command.

use crate::output::{CliError, OutputMode, fail, reject};
use caretaker_core::auth::TokenAuthority;
use caretaker_core::config::{self, ProjectConfig, ProjectPaths};
use caretaker_core::error::{ErrorCode, is_busy};
use caretaker_core::retry::{RetryPolicy, open_store_with_retry};
use caretaker_core::storage::DirObjectStore;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// An initialized project: resolved paths plus its config.
#[derive(Debug)]
pub struct Project {
    pub paths: ProjectPaths,
    pub config: ProjectConfig,
}

impl Project {
    /// Find the project enclosing `start` and load its config.
    ///
    /// # Errors
    ///
    /// Renders and returns `E1001` when no `.caretaker/` exists, or `E1002`
    /// when the config does not parse.
    pub fn discover(start: &Path, output: OutputMode) -> anyhow::Result<Self> {
        let Some(root) = config::find_project_root(start) else {
            return Err(fail(
                output,
                &CliError::from_code(
                    ErrorCode::NotInitialized,
                    "Not a caretaker project: .caretaker directory not found",
                ),
            ));
        };

        let config = config::load_project_config(&root).map_err(|err| {
            fail(
                output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )
        })?;
        let paths = ProjectPaths::resolve(&root, &config);
        debug!(root = %paths.root.display(), "resolved project");
        Ok(Self { paths, config })
    }

    /// Open the task store, retrying while another process holds the lock.
    ///
    /// # Errors
    ///
    /// Renders `E5002` when the store stays busy, otherwise `E9001`.
    pub fn connect(&self, output: OutputMode) -> anyhow::Result<Connection> {
        open_store_with_retry(&self.paths.store, &RetryPolicy::default()).map_err(|err| {
            let busy = err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<rusqlite::Error>())
                .any(is_busy);
            let code = if busy {
                ErrorCode::StoreBusy
            } else {
                ErrorCode::InternalUnexpected
            };
            fail(output, &CliError::from_code(code, format!("{err:#}")))
        })
    }

    /// Token authority keyed by the project secret.
    ///
    /// # Errors
    ///
    /// Renders `E1001` when no secret is available.
    pub fn authority(&self, output: OutputMode) -> anyhow::Result<TokenAuthority> {
        let secret = config::load_secret(&self.paths).map_err(|err| {
            fail(
                output,
                &CliError::from_code(
                    ErrorCode::NotInitialized,
                    format!("No token secret available: {err:#}"),
                ),
            )
        })?;
        TokenAuthority::from_secret(&secret).map_err(|err| reject(output, &err))
    }

    /// Photo store rooted at the configured objects directory.
    pub fn objects(&self) -> DirObjectStore {
        DirObjectStore::new(self.paths.objects.clone())
    }
}
