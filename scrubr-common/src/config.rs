//! Configuration loading and server endpoint resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Compiled default for the sanitization backend
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8765";

/// Environment variable overriding the backend URL
pub const SERVER_URL_ENV: &str = "SCRUBR_SERVER_URL";

/// Default log level when neither RUST_LOG nor the TOML file sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive (e.g. "debug", "scrubr_client=trace")
    pub level: Option<String>,
}

/// Contents of `config.toml`
///
/// Every field is optional; absent fields fall back to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the sanitization backend
    pub server_url: Option<String>,

    /// Per-request HTTP timeout
    pub request_timeout_secs: Option<u64>,

    /// Pause between observing job completion and showing the completion step
    pub completion_delay_ms: Option<u64>,

    /// Consecutive failed polls before the monitor reports stale data
    pub poll_failure_threshold: Option<u32>,

    /// Location of the durable key-value state file
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locate the configuration file for the platform
///
/// Linux checks `~/.config/scrubr/config.toml` first, then `/etc/scrubr/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("scrubr").join("config.toml"));

    if let Some(path) = &user_config {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/scrubr/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    match user_config {
        Some(path) => Err(Error::Config(format!("Config file not found: {:?}", path))),
        None => Err(Error::Config(
            "Could not determine config directory".to_string(),
        )),
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// A missing file yields defaults silently; an unreadable or malformed file
/// yields defaults with a warning. Never fatal.
pub fn load_toml_config(explicit_path: Option<&Path>) -> TomlConfig {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Ok(p) => p,
            Err(e) => {
                debug!("No config file in use: {}", e);
                return TomlConfig::default();
            }
        },
    };

    match read_toml_config(&path) {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded config file");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring config file, using defaults");
            TomlConfig::default()
        }
    }
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    write_atomically(path, content.as_bytes())
}

/// Write bytes via a sibling temp file and rename over the target
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Backend URL resolution, highest priority first:
/// 1. Command-line argument
/// 2. `SCRUBR_SERVER_URL` environment variable
/// 3. TOML config file
/// 4. Compiled default
pub fn resolve_server_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> String {
    if let Some(url) = cli_arg.filter(|u| !u.trim().is_empty()) {
        return normalize_url(url);
    }

    if let Ok(url) = std::env::var(SERVER_URL_ENV) {
        if !url.trim().is_empty() {
            return normalize_url(&url);
        }
    }

    if let Some(url) = toml_config.server_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return normalize_url(url);
    }

    DEFAULT_SERVER_URL.to_string()
}

/// Log filter from TOML, or the compiled default
///
/// `RUST_LOG` is honored by the subscriber itself before this is consulted.
pub fn resolve_log_level(toml_config: &TomlConfig) -> String {
    toml_config
        .logging
        .level
        .clone()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Default location of the durable key-value state file
pub fn default_state_file() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("scrubr").join("state.toml"))
        .unwrap_or_else(|| PathBuf::from("./scrubr_state.toml"))
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
