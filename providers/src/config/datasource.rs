//! Data-source descriptors.
//!
//! A data source identifies one backend instance: which kind of backend it
//! is, how to reach it, and the static labels attached to everything it
//! produces.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

use crate::models::Labels;

/// Connection timeout used when a data source does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Backend kinds known to the provider layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// Loki log-query backend.
    Loki,
    /// Kubernetes control-plane API.
    Kubernetes,
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loki => write!(f, "loki"),
            Self::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// HTTP endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    /// Base URL of the backend, without a trailing API path.
    #[validate(url(message = "Endpoint must be a valid URL"))]
    pub url: String,

    /// Timeout in seconds for health probes.
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout: u64,
}

impl HttpConfig {
    /// Creates HTTP settings with the default timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Basic-auth credentials for HTTP backends.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration identifying one backend instance.
///
/// # Example
///
/// ```
/// use providers::config::{DataSource, DataSourceKind, HttpConfig};
///
/// let source = DataSource::new("logs-prod", DataSourceKind::Loki)
///     .with_http(HttpConfig::new("http://loki:3100"))
///     .with_label("cluster", "prod");
///
/// assert!(source.validate_source().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DataSource {
    /// Human-readable name, unique per deployment.
    #[validate(length(min = 1, message = "Data source name cannot be empty"))]
    pub name: String,

    /// Backend kind.
    pub kind: DataSourceKind,

    /// HTTP endpoint settings (required for HTTP backends).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub http: Option<HttpConfig>,

    /// Static labels attached to every record from this source.
    #[serde(default)]
    pub labels: Labels,

    /// Optional basic-auth credentials for HTTP backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<BasicAuth>,

    /// Kubeconfig content or path (cluster backends). Empty means the
    /// default `$HOME/.kube/config`.
    #[serde(default)]
    pub kube_config: String,
}

/// Errors that can occur while loading or validating data sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The data source name is empty.
    #[error("Data source name cannot be empty")]
    EmptyName,

    /// An HTTP backend has no endpoint configured.
    #[error("Data source '{0}' requires an HTTP endpoint")]
    MissingEndpoint(String),

    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for a data-source list.
    #[error("Failed to parse data sources: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DataSource {
    /// Creates a data source with no endpoint, labels or credentials.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DataSourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            http: None,
            labels: Labels::new(),
            auth: None,
            kube_config: String::new(),
        }
    }

    /// Sets the HTTP endpoint.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = Some(http);
        self
    }

    /// Adds an external label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets the kubeconfig content or path.
    #[must_use]
    pub fn with_kube_config(mut self, kube_config: impl Into<String>) -> Self {
        self.kube_config = kube_config.into();
        self
    }

    /// Validates the data source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty
    /// - An HTTP backend has no endpoint
    /// - The endpoint URL or timeout is invalid
    pub fn validate_source(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.kind == DataSourceKind::Loki && self.http.is_none() {
            return Err(ConfigError::MissingEndpoint(self.name.clone()));
        }
        self.validate()?;
        Ok(())
    }
}

/// Loads and validates a JSON array of data sources from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a JSON array of data
/// sources, or any entry fails validation.
pub fn load_data_sources(path: impl AsRef<Path>) -> Result<Vec<DataSource>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let sources: Vec<DataSource> = serde_json::from_str(&content)?;
    for source in &sources {
        source.validate_source()?;
    }

    tracing::debug!(path = %path.display(), count = sources.len(), "Loaded data sources");
    Ok(sources)
}
