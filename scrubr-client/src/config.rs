//! Resolved client settings
//!
//! Combines the command line, environment and `config.toml` into the values
//! the client actually runs with.

use scrubr_common::config::{default_state_file, resolve_server_url, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

use crate::api::http::DEFAULT_REQUEST_TIMEOUT;
use crate::services::DEFAULT_POLL_FAILURE_THRESHOLD;
use crate::wizard::{WizardSettings, DEFAULT_COMPLETION_DELAY};

/// Effective client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout: Duration,
    pub completion_delay: Duration,
    pub poll_failure_threshold: u32,
    pub state_file: PathBuf,
}

impl ClientSettings {
    /// Resolve settings; `server_arg` is the `--server` value, if given
    pub fn resolve(server_arg: Option<&str>, toml_config: &TomlConfig) -> Self {
        Self {
            server_url: resolve_server_url(server_arg, toml_config),
            request_timeout: toml_config
                .request_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            completion_delay: toml_config
                .completion_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_COMPLETION_DELAY),
            poll_failure_threshold: toml_config
                .poll_failure_threshold
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_POLL_FAILURE_THRESHOLD),
            state_file: toml_config
                .state_file
                .clone()
                .unwrap_or_else(default_state_file),
        }
    }

    pub fn wizard_settings(&self) -> WizardSettings {
        WizardSettings {
            completion_delay: self.completion_delay,
            poll_failure_threshold: self.poll_failure_threshold,
        }
    }
}
