//! Blocking OCI distribution client.
//!
//! Requests go through [`Registry::send`], which negotiates authentication on
//! `401` and retries transport errors, `429`, and `5xx` with exponential
//! backoff. Response bodies are read through the configured document cap, and
//! every document is size-checked and SHA-256 verified before it is decoded.

use std::io::Read;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use pkgdive_common::config::DiveConfig;
use pkgdive_common::constants::{APP_NAME, OCI_INDEX_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE};
use pkgdive_common::types::{ContentDescriptor, Digest};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use sha2::{Digest as _, Sha256};
use tracing::{debug, warn};

use crate::auth::{AuthState, Challenge, TokenResponse, parse_challenge};
use crate::error::{RegistryError, Result};
use crate::reference::PackageReference;

/// Docker schema 2 manifest, still served by some registries.
const DOCKER_MANIFEST_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Docker manifest list.
const DOCKER_MANIFEST_LIST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Longest wait between retries, as a multiple of the initial backoff.
const MAX_BACKOFF_FACTOR: u32 = 16;

/// Media types accepted when resolving a package root.
pub(crate) const ROOT_ACCEPT: &[&str] = &[
    OCI_MANIFEST_MEDIA_TYPE,
    OCI_INDEX_MEDIA_TYPE,
    DOCKER_MANIFEST_MEDIA_TYPE,
    DOCKER_MANIFEST_LIST_MEDIA_TYPE,
];

/// Whether `media_type` names a registry manifest rather than a plain blob.
#[must_use]
pub fn is_manifest_media_type(media_type: &str) -> bool {
    ROOT_ACCEPT.contains(&media_type)
}

/// Whether `media_type` names a multi-platform index.
#[must_use]
pub fn is_index_media_type(media_type: &str) -> bool {
    media_type == OCI_INDEX_MEDIA_TYPE || media_type == DOCKER_MANIFEST_LIST_MEDIA_TYPE
}

/// Connection to one repository of an OCI registry.
#[derive(Debug)]
pub struct Registry {
    reference: PackageReference,
    config: DiveConfig,
    base_url: String,
    http: Client,
    auth: Mutex<AuthState>,
}

impl Registry {
    /// Creates a client for the repository named by `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(reference: PackageReference, config: DiveConfig) -> Result<Self> {
        let scheme = if config.plain_http { "http" } else { "https" };
        let base_url = format!("{scheme}://{}", reference.registry);
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Http {
                url: base_url.clone(),
                source: e,
            })?;

        debug!(
            registry = %reference.registry,
            repository = %reference.repository,
            "registry client ready"
        );
        Ok(Self {
            reference,
            config,
            base_url,
            http,
            auth: Mutex::new(AuthState::Anonymous),
        })
    }

    /// Returns the package reference this client was opened for.
    #[must_use]
    pub const fn reference(&self) -> &PackageReference {
        &self.reference
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DiveConfig {
        &self.config
    }

    pub(crate) fn manifest_url(&self, selector: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{selector}",
            self.base_url, self.reference.repository
        )
    }

    pub(crate) fn blob_url(&self, digest: &Digest) -> String {
        format!(
            "{}/v2/{}/blobs/{digest}",
            self.base_url, self.reference.repository
        )
    }

    /// URL serving `descriptor`: manifests from the manifest endpoint, anything
    /// else (including packaged image manifests) from the blob endpoint.
    fn content_url(&self, descriptor: &ContentDescriptor) -> String {
        if is_manifest_media_type(&descriptor.media_type) {
            self.manifest_url(&descriptor.digest.to_string())
        } else {
            self.blob_url(&descriptor.digest)
        }
    }

    /// Downloads the document at `descriptor` and verifies its size and digest.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DocumentTooLarge` above the configured cap,
    /// `SizeMismatch`/`DigestMismatch` on corrupt content, or the request error.
    pub fn fetch_document(&self, descriptor: &ContentDescriptor) -> Result<Vec<u8>> {
        let limit = self.config.max_document_bytes;
        if descriptor.size > limit {
            return Err(RegistryError::DocumentTooLarge {
                digest: descriptor.digest.to_string(),
                size: descriptor.size,
                limit,
            });
        }

        let url = self.content_url(descriptor);
        debug!(%url, digest = %descriptor.digest, "fetching document");
        let response = self.send(&Method::GET, &url, &[descriptor.media_type.as_str()])?;
        let body = read_body(&url, &descriptor.digest.to_string(), response, limit)?;

        let actual = body.len() as u64;
        if actual != descriptor.size {
            return Err(RegistryError::SizeMismatch {
                digest: descriptor.digest.to_string(),
                expected: descriptor.size,
                actual,
            });
        }
        verify_digest(&descriptor.digest, &body)?;
        Ok(body)
    }

    /// Checks whether the registry holds the content at `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than `404 Not Found`.
    pub fn exists(&self, descriptor: &ContentDescriptor) -> Result<bool> {
        let url = self.content_url(descriptor);
        match self.send(&Method::HEAD, &url, &[descriptor.media_type.as_str()]) {
            Ok(_) => Ok(true),
            Err(RegistryError::Status { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetches a manifest by tag or digest without knowing its descriptor.
    ///
    /// Returns the descriptor computed from the response and the raw body.
    pub(crate) fn fetch_tagged_manifest(
        &self,
        selector: &str,
    ) -> Result<(ContentDescriptor, Vec<u8>)> {
        let url = self.manifest_url(selector);
        let response = self.send(&Method::GET, &url, ROOT_ACCEPT)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let body = read_body(&url, selector, response, self.config.max_document_bytes)?;

        let media_type = match content_type {
            Some(media_type) if is_manifest_media_type(&media_type) => media_type,
            _ => media_type_from_body(&url, &body)?,
        };
        let digest = Digest::sha256(&hex::encode(Sha256::digest(&body)))?;
        let descriptor = ContentDescriptor::new(media_type, digest, body.len() as u64);
        Ok((descriptor, body))
    }

    /// Sends a request, retrying transient failures at most `retries` times.
    fn send(&self, method: &Method, url: &str, accept: &[&str]) -> Result<Response> {
        let mut attempts = 0_u32;
        let operation = || {
            attempts += 1;
            self.send_authorized(method, url, accept)
                .and_then(|response| check_status(url, response))
                .map_err(|err| {
                    if err.is_transient() && attempts <= self.config.retries {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
        };
        let notify = |err: RegistryError, wait: Duration| {
            warn!(
                %url,
                error = %err,
                retry_in_ms = wait.as_millis(),
                "retrying registry request"
            );
        };

        backoff::retry_notify(self.retry_policy(), operation, notify).map_err(|err| match err {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    }

    /// Exponential backoff starting at `retry_backoff_ms`; the attempt count
    /// in [`Registry::send`] bounds it, not elapsed time.
    fn retry_policy(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.config.retry_backoff_ms);
        ExponentialBackoffBuilder::new()
            .with_initial_interval(initial)
            .with_max_interval(initial.saturating_mul(MAX_BACKOFF_FACTOR))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Sends once, answering at most one authentication challenge.
    fn send_authorized(&self, method: &Method, url: &str, accept: &[&str]) -> Result<Response> {
        let response = self
            .request(method, url, accept)
            .send()
            .map_err(|e| http_error(url, e))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_challenge);
        let next = match challenge {
            Some(Challenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                let token = self.fetch_token(&realm, service.as_deref(), scope.as_deref())?;
                AuthState::Bearer(token)
            }
            Some(Challenge::Basic) if self.config.username.is_some() => AuthState::Basic,
            _ => {
                return Err(RegistryError::Unauthorized {
                    url: url.to_string(),
                });
            }
        };
        if *self.auth_state() == next {
            return Err(RegistryError::Unauthorized {
                url: url.to_string(),
            });
        }
        debug!(%url, "authenticated against registry");
        *self.auth_state() = next;

        let response = self
            .request(method, url, accept)
            .send()
            .map_err(|e| http_error(url, e))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Unauthorized {
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    fn request(&self, method: &Method, url: &str, accept: &[&str]) -> RequestBuilder {
        let mut request = self.http.request(method.clone(), url);
        if !accept.is_empty() {
            request = request.header(ACCEPT, accept.join(", "));
        }
        match &*self.auth_state() {
            AuthState::Anonymous => request,
            AuthState::Basic => self.with_basic_auth(request),
            AuthState::Bearer(token) => request.bearer_auth(token),
        }
    }

    fn with_basic_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    fn fetch_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
    ) -> Result<String> {
        let default_scope = format!("repository:{}:pull", self.reference.repository);
        let mut query = vec![("scope", scope.unwrap_or(&default_scope))];
        if let Some(service) = service {
            query.push(("service", service));
        }

        debug!(%realm, "requesting registry token");
        let request = self.with_basic_auth(self.http.get(realm).query(&query));
        let response = request.send().map_err(|e| http_error(realm, e))?;
        if !response.status().is_success() {
            return Err(RegistryError::Unauthorized {
                url: realm.to_string(),
            });
        }
        let body = read_body(realm, "token", response, self.config.max_document_bytes)?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        token.into_token().ok_or_else(|| RegistryError::Unauthorized {
            url: realm.to_string(),
        })
    }

    fn auth_state(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn http_error(url: &str, source: reqwest::Error) -> RegistryError {
    RegistryError::Http {
        url: url.to_string(),
        source,
    }
}

fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RegistryError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Reads at most `limit` bytes of `response`; anything longer is refused
/// without buffering the rest.
fn read_body(url: &str, label: &str, response: Response, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let _ = response
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|source| RegistryError::Body {
            url: url.to_string(),
            source,
        })?;
    if body.len() as u64 > limit {
        return Err(RegistryError::DocumentTooLarge {
            digest: label.to_string(),
            size: body.len() as u64,
            limit,
        });
    }
    Ok(body)
}

/// Checks `body` against `expected`; only SHA-256 content can be verified.
fn verify_digest(expected: &Digest, body: &[u8]) -> Result<()> {
    if expected.algorithm() != pkgdive_common::constants::SHA256_ALGORITHM {
        debug!(digest = %expected, "skipping verification of non-sha256 digest");
        return Ok(());
    }
    let actual = hex::encode(Sha256::digest(body));
    if actual == expected.encoded() {
        Ok(())
    } else {
        Err(RegistryError::DigestMismatch {
            expected: expected.to_string(),
            actual: format!("sha256:{actual}"),
        })
    }
}

/// Falls back to the `mediaType` field when the registry omits `Content-Type`.
fn media_type_from_body(url: &str, body: &[u8]) -> Result<String> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Shape {
        media_type: Option<String>,
        manifests: Option<serde_json::Value>,
    }

    let shape: Shape = serde_json::from_slice(body)?;
    match shape.media_type {
        Some(media_type) if is_manifest_media_type(&media_type) => Ok(media_type),
        Some(media_type) => Err(RegistryError::UnsupportedMediaType {
            url: url.to_string(),
            media_type,
        }),
        None if shape.manifests.is_some() => Ok(OCI_INDEX_MEDIA_TYPE.to_string()),
        None => Ok(OCI_MANIFEST_MEDIA_TYPE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_media_types_use_manifest_endpoint() {
        assert!(is_manifest_media_type(OCI_MANIFEST_MEDIA_TYPE));
        assert!(is_manifest_media_type(OCI_INDEX_MEDIA_TYPE));
        assert!(!is_manifest_media_type(
            pkgdive_common::constants::PACKAGE_BLOB_MEDIA_TYPE
        ));
    }

    #[test]
    fn verify_digest_accepts_matching_content() {
        let digest = Digest::sha256(&hex::encode(Sha256::digest(b"hello"))).expect("digest");
        assert!(verify_digest(&digest, b"hello").is_ok());
    }

    #[test]
    fn verify_digest_rejects_tampered_content() {
        let digest = Digest::sha256(&hex::encode(Sha256::digest(b"hello"))).expect("digest");
        assert!(matches!(
            verify_digest(&digest, b"hellO"),
            Err(RegistryError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn media_type_from_body_detects_index_without_field() {
        let media_type =
            media_type_from_body("u", br#"{"schemaVersion":2,"manifests":[]}"#).expect("media type");
        assert_eq!(media_type, OCI_INDEX_MEDIA_TYPE);
    }

    #[test]
    fn media_type_from_body_rejects_unknown_type() {
        let result = media_type_from_body("u", br#"{"mediaType":"text/plain"}"#);
        assert!(matches!(
            result,
            Err(RegistryError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn retry_policy_saturates_large_backoff() {
        let reference = PackageReference::parse("registry.example.com/org/pkg:1.0").expect("parse");
        let config = DiveConfig {
            retry_backoff_ms: u64::MAX,
            ..DiveConfig::default()
        };
        let registry = Registry::new(reference, config).expect("client");
        let policy = registry.retry_policy();
        assert_eq!(policy.initial_interval, Duration::from_millis(u64::MAX));
        assert_eq!(policy.max_interval, Duration::MAX);
        assert_eq!(policy.max_elapsed_time, None);
    }

    #[test]
    fn urls_follow_distribution_layout() {
        let reference = PackageReference::parse("registry.example.com/org/pkg:1.0").expect("parse");
        let registry = Registry::new(reference, DiveConfig::default()).expect("client");
        assert_eq!(
            registry.manifest_url("1.0"),
            "https://registry.example.com/v2/org/pkg/manifests/1.0"
        );
        let digest = Digest::sha256(&"a".repeat(64)).expect("digest");
        assert_eq!(
            registry.blob_url(&digest),
            format!("https://registry.example.com/v2/org/pkg/blobs/sha256:{}", "a".repeat(64))
        );
    }
}
