use authsweep_core::UNAUTHORIZED_MESSAGE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{name} binary not found. Looked in: {}", display_paths(.candidates))]
    BinaryNotFound {
        name: &'static str,
        candidates: Vec<PathBuf>,
    },
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Username/password pair the tester authenticates with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub password: String,
}

impl Identity {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Everything a sweep run needs to know. Loadable from JSON; any field left
/// out of the file keeps its default.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Root of the server build tree, used to discover binaries that are not
    /// given explicitly.
    pub project_dir: Option<PathBuf>,
    pub server_binary: Option<PathBuf>,
    pub tester_binary: Option<PathBuf>,
    pub checker_binary: Option<PathBuf>,

    pub host: String,
    pub port: u16,
    /// Flag that points the server at its durability directory
    pub durability_flag: String,
    /// Extra arguments appended to the server command line
    pub server_args: Vec<String>,

    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub launch_grace_ms: u64,
    pub shutdown_timeout_ms: u64,

    pub admin: Identity,
    pub user: Identity,
    pub role_name: String,
    pub unauthorized_message: String,
    /// Largest permission universe the subset sweep accepts (2^n runs).
    pub max_permissions: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            project_dir: None,
            server_binary: None,
            tester_binary: None,
            checker_binary: None,
            host: "127.0.0.1".to_string(),
            port: 7687,
            durability_flag: "--durability-directory".to_string(),
            server_args: Vec::new(),
            ready_timeout_ms: 30_000,
            poll_interval_ms: 10,
            settle_delay_ms: 100,
            launch_grace_ms: 100,
            shutdown_timeout_ms: 10_000,
            admin: Identity::new("admin", "admin"),
            user: Identity::new("user", "user"),
            role_name: "role".to_string(),
            unauthorized_message: UNAUTHORIZED_MESSAGE.to_string(),
            max_permissions: 16,
        }
    }
}

/// Resolved paths of the three external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binaries {
    pub server: PathBuf,
    pub tester: PathBuf,
    pub checker: PathBuf,
}

/// Build directories searched, in order, under the project directory.
const BUILD_DIRS: [&str; 2] = ["build", "build_debug"];
const SERVER_RELATIVE: &str = "memgraph";
const TESTER_RELATIVE: &str = "tests/integration/auth/tester";
const CHECKER_RELATIVE: &str = "tests/integration/auth/checker";

impl SweepConfig {
    /// Load config from a JSON file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save config as pretty JSON
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn launch_grace(&self) -> Duration {
        Duration::from_millis(self.launch_grace_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Check values that would make a run meaningless or hang.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("port", "must be non-zero"));
        }
        if self.host.is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.durability_flag.is_empty() {
            return Err(invalid("durability_flag", "must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be non-zero"));
        }
        if self.ready_timeout_ms == 0 {
            return Err(invalid("ready_timeout_ms", "must be non-zero"));
        }
        if self.admin.username.is_empty() || self.user.username.is_empty() {
            return Err(invalid("username", "admin and user names must not be empty"));
        }
        if self.admin.username == self.user.username {
            return Err(invalid("username", "admin and user must be different identities"));
        }
        if self.role_name.is_empty() {
            return Err(invalid("role_name", "must not be empty"));
        }
        if self.unauthorized_message.is_empty() {
            return Err(invalid("unauthorized_message", "must not be empty"));
        }
        if self.max_permissions > 63 {
            return Err(invalid(
                "max_permissions",
                format!("{} does not fit a 64-bit subset mask", self.max_permissions),
            ));
        }
        Ok(())
    }

    /// Resolve server, tester and checker paths.
    ///
    /// Explicit paths must exist. Missing ones are searched for under
    /// `project_dir` (current directory if unset) in `build/`, then
    /// `build_debug/`.
    pub fn resolve_binaries(&self) -> Result<Binaries, ConfigError> {
        let project_dir = self
            .project_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Binaries {
            server: resolve(
                "server",
                self.server_binary.as_deref(),
                &project_dir,
                SERVER_RELATIVE,
            )?,
            tester: resolve(
                "tester",
                self.tester_binary.as_deref(),
                &project_dir,
                TESTER_RELATIVE,
            )?,
            checker: resolve(
                "checker",
                self.checker_binary.as_deref(),
                &project_dir,
                CHECKER_RELATIVE,
            )?,
        })
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn resolve(
    name: &'static str,
    explicit: Option<&Path>,
    project_dir: &Path,
    relative: &str,
) -> Result<PathBuf, ConfigError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => BUILD_DIRS
            .iter()
            .map(|dir| project_dir.join(dir).join(relative))
            .collect(),
    };
    if let Some(found) = candidates.iter().find(|path| path.is_file()).cloned() {
        return Ok(found);
    }
    Err(ConfigError::BinaryNotFound { name, candidates })
}
