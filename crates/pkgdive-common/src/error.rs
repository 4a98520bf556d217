//! Unified error types for the pkgdive workspace.
//!
//! The registry transport defines its own error enum and reaches the planner
//! through [`FetchError`], which [`DiveError::RemoteFetch`] wraps together with
//! the name of the failed operation.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error produced by an external fetch collaborator.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DiveError {
    /// A requested component is not declared by the package.
    #[error("component {name} does not exist in this package")]
    ComponentNotFound {
        /// Name that matched no component.
        name: String,
    },

    /// No manifest in the image index carries the requested base-image name.
    #[error("image {reference} not found in the package image index")]
    ImageNotFound {
        /// Image reference that matched no index entry.
        reference: String,
    },

    /// A blob required by the plan is not part of the package layout.
    #[error("blob {path} not found in the package layout")]
    BlobNotFound {
        /// Well-known relative path that could not be located.
        path: String,
    },

    /// The image index is ambiguous for a requested image.
    #[error("image index is malformed: {matches} manifests are annotated as {reference}")]
    MalformedIndex {
        /// Image reference with more than one match.
        reference: String,
        /// Number of manifests sharing the annotation.
        matches: usize,
    },

    /// A remote document could not be fetched.
    #[error("failed to fetch {operation}: {source}")]
    RemoteFetch {
        /// Operation that failed (e.g. "images index").
        operation: String,
        /// Underlying transport error.
        source: FetchError,
    },

    /// A content digest string is malformed.
    #[error("invalid digest: {value}")]
    InvalidDigest {
        /// Offending digest string.
        value: String,
    },

    /// A configuration value or package document is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl DiveError {
    /// Wraps a collaborator failure with the operation that triggered it.
    #[must_use]
    pub fn remote_fetch(operation: impl Into<String>, source: FetchError) -> Self {
        Self::RemoteFetch {
            operation: operation.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_not_found_names_the_component() {
        let err = DiveError::ComponentNotFound { name: "Z".into() };
        assert_eq!(err.to_string(), "component Z does not exist in this package");
    }

    #[test]
    fn remote_fetch_keeps_operation_and_cause() {
        let cause: FetchError = "connection reset".into();
        let err = DiveError::remote_fetch("images index", cause);
        assert_eq!(
            err.to_string(),
            "failed to fetch images index: connection reset"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
