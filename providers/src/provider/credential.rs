//! Cluster credential resolution.
//!
//! A data source's kube credential is either inline kubeconfig YAML or a
//! filesystem path. An input naming an existing file is read from disk;
//! anything else is treated as inline content. An empty input means
//! `$HOME/.kube/config`.

use kube::config::Kubeconfig;
use std::path::{Path, PathBuf};

use crate::error::ProviderError;

/// Where a resolved credential came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOrigin {
    /// Read from this file.
    File(PathBuf),
    /// Taken verbatim from the data source.
    Inline,
}

/// A parsed kubeconfig and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    /// Where the kubeconfig came from.
    pub origin: CredentialOrigin,
    /// The parsed kubeconfig.
    pub kubeconfig: Kubeconfig,
}

/// Returns `$HOME/.kube/config`, if `HOME` is set.
#[must_use]
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".kube").join("config"))
}

/// Resolves a kube credential input into a parsed kubeconfig.
///
/// # Errors
///
/// Returns [`ProviderError::Credential`] if the input is empty and no
/// default kubeconfig exists, if a named file cannot be read, or if the
/// content is not a kubeconfig defining at least one cluster.
pub fn resolve_credential(input: &str) -> Result<ResolvedCredential, ProviderError> {
    resolve_credential_with_default(input, default_kubeconfig_path().as_deref())
}

fn resolve_credential_with_default(
    input: &str,
    default_path: Option<&Path>,
) -> Result<ResolvedCredential, ProviderError> {
    let (content, origin) = if input.trim().is_empty() {
        let path = default_path.ok_or_else(|| {
            ProviderError::Credential("no kubeconfig given and HOME is not set".to_string())
        })?;
        if !path.is_file() {
            return Err(ProviderError::Credential(format!(
                "no kubeconfig given and {} does not exist",
                path.display()
            )));
        }
        (read_file(path)?, CredentialOrigin::File(path.to_path_buf()))
    } else {
        let path = Path::new(input);
        if path.is_file() {
            (read_file(path)?, CredentialOrigin::File(path.to_path_buf()))
        } else {
            (input.to_string(), CredentialOrigin::Inline)
        }
    };

    let kubeconfig = Kubeconfig::from_yaml(&content)
        .map_err(|e| ProviderError::Credential(format!("invalid kubeconfig: {e}")))?;

    if kubeconfig.clusters.is_empty() {
        return Err(ProviderError::Credential(
            "kubeconfig defines no clusters".to_string(),
        ));
    }

    tracing::debug!(?origin, "Resolved kube credential");
    Ok(ResolvedCredential { origin, kubeconfig })
}

fn read_file(path: &Path) -> Result<String, ProviderError> {
    std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read kubeconfig");
        ProviderError::Credential(format!("failed to read {}: {e}", path.display()))
    })
}
