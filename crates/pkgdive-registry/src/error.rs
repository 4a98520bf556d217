//! Error types for registry transport operations.

use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while talking to an OCI registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The package source string could not be parsed.
    #[error("invalid package reference '{reference}': {message}")]
    InvalidReference {
        /// The offending source string.
        reference: String,
        /// Why it was rejected.
        message: String,
    },

    /// The HTTP request failed before a response arrived.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        source: reqwest::Error,
    },

    /// The registry answered with an unexpected status.
    #[error("{url} returned {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The registry refused the credentials or the token exchange failed.
    #[error("unauthorized: {url}")]
    Unauthorized {
        /// Requested URL.
        url: String,
    },

    /// Downloaded content does not hash to the expected digest.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest from the descriptor.
        expected: String,
        /// Digest of the received bytes.
        actual: String,
    },

    /// Downloaded content does not have the expected length.
    #[error("size mismatch for {digest}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Digest of the document.
        digest: String,
        /// Size from the descriptor.
        expected: u64,
        /// Number of bytes received.
        actual: u64,
    },

    /// The document exceeds the configured size cap.
    #[error("document {digest} exceeds the {limit} byte limit ({size} bytes)")]
    DocumentTooLarge {
        /// Digest of the document, or what was requested when it is unknown.
        digest: String,
        /// Declared size, or the bytes read before giving up.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The registry served a document of a kind this tool cannot use.
    #[error("unsupported media type {media_type} for {url}")]
    UnsupportedMediaType {
        /// Requested URL.
        url: String,
        /// Media type received.
        media_type: String,
    },

    /// A multi-platform package has no root for the requested platform.
    #[error("platform '{platform}' not available for package '{reference}'")]
    PlatformNotAvailable {
        /// The package reference.
        reference: String,
        /// The requested platform.
        platform: String,
    },

    /// A file the package layout requires is missing from the root manifest.
    #[error("package root has no {path} layer")]
    MissingPackageFile {
        /// Well-known relative path.
        path: String,
    },

    /// A JSON document could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response body could not be read.
    #[error("failed to read response from {url}: {source}")]
    Body {
        /// Request URL.
        url: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A shared error: malformed digests, package manifest decoding, planning.
    #[error(transparent)]
    Common(#[from] pkgdive_common::error::DiveError),
}

impl RegistryError {
    /// Create an invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
