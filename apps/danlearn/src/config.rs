//! # Configuration
//!
//! Server, storage, clock and evaluator settings.
//!
//! Resolution order (later wins):
//! 1. Built-in defaults
//! 2. TOML file passed with `--config`
//! 3. Environment variables
//! 4. Explicit CLI flags (applied by the `cli` module)
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DANLEARN_HOST` | `server.host` |
//! | `DANLEARN_PORT` | `server.port` |
//! | `DANLEARN_API_KEY` | `server.api_key` |
//! | `DANLEARN_RATE_LIMIT` | `server.rate_limit` |
//! | `DANLEARN_CORS_ORIGINS` | `server.cors_origins` |
//! | `DANLEARN_DATABASE` | `storage.database` |
//! | `DANLEARN_BACKEND` | `storage.backend` |
//! | `DANLEARN_UTC_OFFSET_MINUTES` | `clock.utc_offset_minutes` |
//! | `OPENAI_API_KEY` | `evaluator.api_key` |
//! | `DANLEARN_EVALUATOR_URL` | `evaluator.base_url` |
//! | `DANLEARN_EVALUATOR_MODEL` | `evaluator.model` |
//! | `DANLEARN_EVALUATOR_TIMEOUT_SECS` | `evaluator.timeout_secs` |

use danlearn_core::{DanlearnError, StorageBackend, SystemClock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Maximum size of a configuration file (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on every route except `/health`.
    pub api_key: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Comma-separated origins, or `*`. Unset means localhost only.
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            rate_limit: 100,
            cors_origins: None,
        }
    }
}

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Redb,
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redb => f.write_str("redb"),
            BackendKind::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = DanlearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(BackendKind::Redb),
            "memory" => Ok(BackendKind::Memory),
            other => Err(DanlearnError::IoError(format!(
                "Unknown backend '{}'. Use 'redb' or 'memory'.",
                other
            ))),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Redb,
            database: PathBuf::from("danlearn.db"),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<StorageBackend, DanlearnError> {
        match self.backend {
            BackendKind::Redb => StorageBackend::open_redb(&self.database),
            BackendKind::Memory => Ok(StorageBackend::default()),
        }
    }
}

/// Reference timezone for calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset east of UTC in minutes.
    pub utc_offset_minutes: i32,
}

impl ClockConfig {
    /// Wall clock with the configured offset.
    #[must_use]
    pub fn system_clock(&self) -> SystemClock {
        SystemClock::with_offset_minutes(self.utc_offset_minutes)
    }
}

/// Answer evaluator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Credential for the completions endpoint. Unset selects the neutral evaluator.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 20,
        }
    }
}

impl EvaluatorConfig {
    /// Upper bound for one evaluation.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub clock: ClockConfig,
    pub evaluator: EvaluatorConfig,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, DanlearnError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, DanlearnError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            DanlearnError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(DanlearnError::IoError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            DanlearnError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML text. Missing sections and fields take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, DanlearnError> {
        toml::from_str(content)
            .map_err(|e| DanlearnError::DeserializationError(format!("Parse TOML failed: {}", e)))
    }

    /// Override fields from environment-style variables.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("DANLEARN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("DANLEARN_PORT") {
            parse_into(&mut self.server.port, "DANLEARN_PORT", &port);
        }
        if let Some(key) = get("DANLEARN_API_KEY") {
            self.server.api_key = Some(key);
        }
        if let Some(limit) = get("DANLEARN_RATE_LIMIT") {
            parse_into(&mut self.server.rate_limit, "DANLEARN_RATE_LIMIT", &limit);
        }
        if let Some(origins) = get("DANLEARN_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }
        if let Some(database) = get("DANLEARN_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(backend) = get("DANLEARN_BACKEND") {
            parse_into(&mut self.storage.backend, "DANLEARN_BACKEND", &backend);
        }
        if let Some(offset) = get("DANLEARN_UTC_OFFSET_MINUTES") {
            parse_into(
                &mut self.clock.utc_offset_minutes,
                "DANLEARN_UTC_OFFSET_MINUTES",
                &offset,
            );
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.evaluator.api_key = Some(key);
        }
        if let Some(url) = get("DANLEARN_EVALUATOR_URL") {
            self.evaluator.base_url = url;
        }
        if let Some(model) = get("DANLEARN_EVALUATOR_MODEL") {
            self.evaluator.model = model;
        }
        if let Some(secs) = get("DANLEARN_EVALUATOR_TIMEOUT_SECS") {
            parse_into(
                &mut self.evaluator.timeout_secs,
                "DANLEARN_EVALUATOR_TIMEOUT_SECS",
                &secs,
            );
        }
    }

    /// Bind address for the HTTP server.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_into<T: FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(variable = key, value = raw, "Ignoring unparseable value"),
    }
}

// =============================================================================
// TESTS
// =============================================================================
