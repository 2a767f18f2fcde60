//! Configuration for the sync engine.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Request timeout used when a template leaves it blank.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// File name prefix used when a template leaves it blank.
pub const DEFAULT_FILE_NAME_PREFIX: &str = "configpump";
/// Number of `show jobs` polls before a commit is given up on.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
/// Seconds slept before each `show jobs` poll.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Connection settings for one run.
///
/// Resolved once before a run starts and never changed during it.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Base URL, e.g. `https://panorama.example.com`.
    pub panorama_url: String,
    /// API key sent with every request.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification.
    pub ignore_ssl_warnings: bool,
    /// Prefix of the file name configurations are imported under.
    pub file_name_prefix: String,
}

impl ConnectionConfig {
    /// Creates a connection configuration with default timeout and prefix.
    pub fn new(panorama_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            panorama_url: panorama_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            ignore_ssl_warnings: false,
            file_name_prefix: DEFAULT_FILE_NAME_PREFIX.to_string(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether certificate errors are ignored.
    pub fn with_ignore_ssl_warnings(mut self, ignore: bool) -> Self {
        self.ignore_ssl_warnings = ignore;
        self
    }

    /// Sets the import file name prefix.
    pub fn with_file_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_name_prefix = prefix.into();
        self
    }

    /// The XML API endpoint, `<base>/api/`.
    pub fn api_url(&self) -> String {
        format!("{}/api/", self.panorama_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("panorama_url", &self.panorama_url)
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .field("ignore_ssl_warnings", &self.ignore_ssl_warnings)
            .field("file_name_prefix", &self.file_name_prefix)
            .finish()
    }
}

/// Commit job polling behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of polls.
    pub attempts: u32,
    /// Sleep before each poll.
    pub interval: Duration,
}

impl PollConfig {
    /// Creates a poll configuration with the default interval.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Sets the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Upper bound of the time spent polling.
    pub fn max_wait(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_ATTEMPTS)
    }
}

/// A named Panorama endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTemplate {
    /// Unique template name.
    pub name: String,
    /// Base URL; only `http` and `https` are accepted.
    pub panorama_url: String,
    /// Key into [`PluginSettings::tokens`].
    pub token_key: String,
    /// Request timeout in seconds (1-3600); blank uses the plugin default.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Import file name prefix; blank uses the plugin default.
    #[serde(default)]
    pub file_name_prefix: Option<String>,
}

impl ConnectionTemplate {
    /// Creates a template with blank optional fields.
    pub fn new(
        name: impl Into<String>,
        panorama_url: impl Into<String>,
        token_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            panorama_url: panorama_url.into(),
            token_key: token_key.into(),
            request_timeout: None,
            file_name_prefix: None,
        }
    }

    /// Sets the request timeout in seconds.
    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = Some(seconds);
        self
    }

    /// Sets the file name prefix.
    pub fn with_file_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_name_prefix = Some(prefix.into());
        self
    }

    /// Checks the field constraints.
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::validation(
                "Connection template name must not be empty.",
            ));
        }

        let scheme_ok = reqwest::Url::parse(&self.panorama_url)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !scheme_ok {
            return Err(EngineError::validation(format!(
                "Panorama URL must start with http:// or https://: {}",
                self.panorama_url
            )));
        }

        if let Some(timeout) = self.request_timeout {
            if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&timeout) {
                return Err(EngineError::validation(format!(
                    "Request timeout must be between 1 and {} seconds, got {}.",
                    MAX_REQUEST_TIMEOUT_SECS, timeout
                )));
            }
        }

        Ok(())
    }
}

/// Deployment-wide settings, usually loaded from a JSON file.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// Timeout in seconds for templates without one.
    pub default_request_timeout: u64,
    /// File name prefix for templates without one.
    pub default_filename_prefix: String,
    /// Skip TLS certificate verification.
    pub ignore_ssl_warnings: bool,
    /// API keys by token key.
    pub tokens: BTreeMap<String, String>,
    /// Number of commit job polls.
    pub commit_poll_attempts: u32,
    /// Seconds between commit job polls.
    pub commit_poll_interval: u64,
    /// Known endpoints.
    pub connection_templates: Vec<ConnectionTemplate>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            default_request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            default_filename_prefix: DEFAULT_FILE_NAME_PREFIX.to_string(),
            ignore_ssl_warnings: false,
            tokens: BTreeMap::new(),
            commit_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            commit_poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            connection_templates: Vec::new(),
        }
    }
}

impl fmt::Debug for PluginSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSettings")
            .field("default_request_timeout", &self.default_request_timeout)
            .field("default_filename_prefix", &self.default_filename_prefix)
            .field("ignore_ssl_warnings", &self.ignore_ssl_warnings)
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .field("commit_poll_attempts", &self.commit_poll_attempts)
            .field("commit_poll_interval", &self.commit_poll_interval)
            .field("connection_templates", &self.connection_templates)
            .finish()
    }
}

impl PluginSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid plugin settings: {}", e)))
    }

    /// Reads settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!(
                "failed to read plugin settings {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Looks up a template by name.
    pub fn template(&self, name: &str) -> EngineResult<&ConnectionTemplate> {
        self.connection_templates
            .iter()
            .find(|template| template.name == name)
            .ok_or_else(|| {
                EngineError::config(format!("Connection template '{}' not found.", name))
            })
    }

    /// Builds the connection configuration for a template.
    pub fn resolve(&self, template: &ConnectionTemplate) -> EngineResult<ConnectionConfig> {
        template.validate()?;

        let token = self.tokens.get(&template.token_key).ok_or_else(|| {
            EngineError::config(format!(
                "Token key '{}' not found in plugin configuration.",
                template.token_key
            ))
        })?;

        let timeout = template
            .request_timeout
            .filter(|seconds| *seconds > 0)
            .unwrap_or(self.default_request_timeout);
        let prefix = template
            .file_name_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(&self.default_filename_prefix);

        Ok(ConnectionConfig::new(template.panorama_url.clone(), token.clone())
            .with_timeout(Duration::from_secs(timeout))
            .with_ignore_ssl_warnings(self.ignore_ssl_warnings)
            .with_file_name_prefix(prefix))
    }

    /// Polling behavior.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.commit_poll_attempts)
            .with_interval(Duration::from_secs(self.commit_poll_interval))
    }

    /// Every configured token, for log redaction.
    pub fn secrets(&self) -> Vec<String> {
        self.tokens.values().cloned().collect()
    }
}
