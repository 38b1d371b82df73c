//! Client configuration.
//!
//! Configuration can be built in code with the `with_*` methods or loaded
//! from a TOML file. String values that carry credentials (`token`,
//! `session_cookie`, header values) may contain `${VAR}` placeholders that
//! are expanded from the environment when the client is built.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Configuration for talking to the orchestration API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the orchestration server, e.g. `http://localhost:8080`.
    pub host: String,
    /// Default namespace for namespaced resources.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Bearer token sent as `Authorization`.
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable consulted when `token` is unset.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Session cookie issued by the authenticating gateway.
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Page size used when listing collections.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Version upload policy.
    #[serde(default)]
    pub upload: UploadPolicy,
}

/// Upper bound for `timeout_seconds` (one day).
pub const MAX_TIMEOUT_SECONDS: f64 = 86_400.0;

fn default_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    format!("pipesync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_token_env() -> String {
    "PIPESYNC_TOKEN".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            namespace: None,
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            token: None,
            token_env: default_token_env(),
            session_cookie: None,
            headers: HashMap::new(),
            page_size: default_page_size(),
            upload: UploadPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given host with defaults.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the gateway session cookie.
    #[must_use]
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the upload policy.
    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload = policy;
        self
    }

    /// Gets timeout as Duration.
    ///
    /// Falls back to the default timeout when `timeout_seconds` is not a
    /// representable duration; [`validate`](Self::validate) rejects such values.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout()))
    }

    /// Returns the host without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// Resolves the bearer token from config or environment.
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        if let Some(token) = &self.token {
            return Some(expand_env_vars(token));
        }
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }

    /// Resolves the session cookie with placeholders expanded.
    #[must_use]
    pub fn resolve_session_cookie(&self) -> Option<String> {
        self.session_cookie.as_deref().map(expand_env_vars)
    }

    /// Returns the extra headers with placeholders expanded.
    #[must_use]
    pub fn resolved_headers(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), expand_env_vars(v)))
            .collect()
    }

    /// Checks the configuration for values the client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.base_url();
        if host.is_empty() {
            return Err(ConfigError::InvalidHost("host is empty".to_string()));
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ConfigError::InvalidHost(format!(
                "'{host}' must start with http:// or https://"
            )));
        }
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds",
                reason: format!("must be positive, got {}", self.timeout_seconds),
            });
        }
        if self.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds",
                reason: format!(
                    "must be at most {MAX_TIMEOUT_SECONDS}, got {}",
                    self.timeout_seconds
                ),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Policy for conflict recovery during version upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Delete-and-retry cycles allowed after the first upload attempt.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Pause between deleting a conflicting version and re-uploading.
    #[serde(default)]
    pub retry_delay_ms: u64,
}

fn default_retry_budget() -> u32 {
    1
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            retry_delay_ms: 0,
        }
    }
}

impl UploadPolicy {
    /// Creates a policy with the given retry budget.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Sets the pause between delete and re-upload.
    #[must_use]
    pub fn with_retry_delay_ms(mut self, delay: u64) -> Self {
        self.retry_delay_ms = delay;
        self
    }

    /// Gets the retry delay as Duration.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

static ENV_PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Expands `${VAR}` placeholders from the environment.
///
/// Unset variables leave the placeholder unchanged.
#[must_use]
pub fn expand_env_vars(s: &str) -> String {
    let Some(placeholder) = ENV_PLACEHOLDER.as_ref() else {
        return s.to_string();
    };
    placeholder
        .replace_all(s, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        /// The config file path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying parse error.
        source: toml::de::Error,
    },

    /// The host URL is unusable.
    #[error("Invalid host: {0}")]
    InvalidHost(String),

    /// A header name or value cannot be sent.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// The header name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric setting is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
