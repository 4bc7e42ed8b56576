//! Provider error taxonomy.
//!
//! Every failure a provider can hit maps onto one of these variants and is
//! returned to the caller unchanged. An empty result is never an error, and
//! an error is never downgraded to an empty result.

use thiserror::Error;

/// Errors returned by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport, DNS or TLS failure before a response was received.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}: {message}")]
    BackendStatus {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body or backend-provided reason.
        message: String,
    },

    /// The backend answered with a body that does not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Cluster credentials could not be read or parsed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The caller canceled the operation.
    #[error("Operation cancelled")]
    Cancelled,

    /// The data-source descriptor is unusable.
    #[error("Invalid data source configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Returns true if the error came from the backend itself (bad status or body).
    #[must_use]
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::BackendStatus { .. } | Self::MalformedResponse(_))
    }

    /// Returns true if the caller canceled the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<kube::Error> for ProviderError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => Self::BackendStatus {
                status: response.code,
                message: response.message,
            },
            kube::Error::SerdeError(e) => Self::MalformedResponse(e.to_string()),
            kube::Error::InferConfig(e) => Self::Credential(e.to_string()),
            other => Self::Connection(other.to_string()),
        }
    }
}
