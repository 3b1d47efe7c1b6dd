use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project state directory, relative to the project root.
pub const PROJECT_DIR: &str = ".caretaker";
pub const CONFIG_FILE: &str = "config.toml";
pub const SECRET_FILE: &str = "secret";
pub const SECRET_ENV: &str = "CARETAKER_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file, relative to `.caretaker/`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Photo object directory, relative to `.caretaker/`.
    #[serde(default = "default_objects_dir")]
    pub objects_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            objects_dir: default_objects_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_task_list_secs")]
    pub task_list_secs: u64,
    #[serde(default = "default_task_detail_secs")]
    pub task_detail_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            task_list_secs: default_task_list_secs(),
            task_detail_secs: default_task_detail_secs(),
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub const fn task_list_interval(&self) -> Duration {
        Duration::from_secs(self.task_list_secs)
    }

    #[must_use]
    pub const fn task_detail_interval(&self) -> Duration {
        Duration::from_secs(self.task_detail_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Absolute paths derived from a project root and its config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config_file: PathBuf,
    pub secret_file: PathBuf,
    pub store: PathBuf,
    pub objects: PathBuf,
}

impl ProjectPaths {
    #[must_use]
    pub fn resolve(project_root: &Path, config: &ProjectConfig) -> Self {
        let state_dir = project_root.join(PROJECT_DIR);
        Self {
            root: project_root.to_path_buf(),
            config_file: state_dir.join(CONFIG_FILE),
            secret_file: state_dir.join(SECRET_FILE),
            store: state_dir.join(&config.store.path),
            objects: state_dir.join(&config.storage.objects_dir),
            state_dir,
        }
    }
}

/// Walk up from `start` to the nearest directory holding `.caretaker/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("caretaker/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Render a config as the TOML written by `ct init`.
pub fn render_project_config(config: &ProjectConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize project config")
}

/// Token signing secret: `CARETAKER_SECRET`, else `.caretaker/secret`.
pub fn load_secret(paths: &ProjectPaths) -> Result<String> {
    if let Some(secret) = env::var(SECRET_ENV).ok().filter(|s| !s.trim().is_empty()) {
        return Ok(secret);
    }
    let secret = std::fs::read_to_string(&paths.secret_file)
        .with_context(|| format!("Failed to read {}", paths.secret_file.display()))?;
    Ok(secret.trim().to_string())
}

/// Normalize an output mode name, accepting legacy aliases.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// `--json` beats `FORMAT`, which beats the user config, which beats TTY
/// detection.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("caretaker.db")
}

fn default_objects_dir() -> PathBuf {
    PathBuf::from("objects")
}

const fn default_task_list_secs() -> u64 {
    10
}

const fn default_task_detail_secs() -> u64 {
    8
}

const fn default_token_ttl_hours() -> u64 {
    12
}
