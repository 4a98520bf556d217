//! Package source parsing.
//!
//! Accepts `oci://registry/repository:tag`, `oci://registry/repository@digest`,
//! and the same forms without the `oci://` scheme.

use std::fmt;
use std::str::FromStr;

use pkgdive_common::types::Digest;

use crate::error::{RegistryError, Result};

const OCI_SCHEME: &str = "oci://";

/// Tag or digest selecting a manifest in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Mutable tag.
    Tag(String),
    /// Immutable content digest.
    Digest(Digest),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Digest(digest) => write!(f, "{digest}"),
        }
    }
}

/// Parsed location of a package in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    /// Registry host, with port if any.
    pub registry: String,
    /// Repository path within the registry.
    pub repository: String,
    /// Tag or digest of the package root.
    pub selector: Selector,
}

impl PackageReference {
    /// Parses a package source string.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidReference` if the registry host,
    /// repository, or tag/digest is missing or malformed.
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |message: &str| RegistryError::invalid_reference(source, message);
        let rest = source.trim();
        let rest = rest.strip_prefix(OCI_SCHEME).unwrap_or(rest);

        let (registry, path) = rest
            .split_once('/')
            .ok_or_else(|| invalid("expected registry/repository"))?;
        if !(registry.contains('.') || registry.contains(':') || registry == "localhost") {
            return Err(invalid("registry host is missing"));
        }

        let (repository, selector) = if let Some((named, digest)) = path.split_once('@') {
            let digest = Digest::parse(digest).map_err(|e| invalid(&e.to_string()))?;
            // `repo:tag@digest`: the digest pins the root, the tag is dropped.
            let repository = match split_tag(named) {
                Some((repository, tag)) if is_valid_tag(tag) => repository,
                Some(_) => return Err(invalid("tag is malformed")),
                None => named,
            };
            (repository, Selector::Digest(digest))
        } else {
            let (repository, tag) =
                split_tag(path).ok_or_else(|| invalid("a tag or digest is required"))?;
            if !is_valid_tag(tag) {
                return Err(invalid("tag is malformed"));
            }
            (repository, Selector::Tag(tag.to_string()))
        };

        if repository.is_empty()
            || repository.split('/').any(str::is_empty)
            || repository
                .chars()
                .any(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || "/._-".contains(c)))
        {
            return Err(invalid("repository is malformed"));
        }

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            selector,
        })
    }
}

/// Splits `repository:tag` on the last colon outside any path segment.
fn split_tag(path: &str) -> Option<(&str, &str)> {
    let pos = path.rfind(':')?;
    (!path[pos..].contains('/')).then_some((&path[..pos], &path[pos + 1..]))
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= 128
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c))
}

impl FromStr for PackageReference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Tag(tag) => write!(f, "{}/{}:{tag}", self.registry, self.repository),
            Selector::Digest(digest) => {
                write!(f, "{}/{}@{digest}", self.registry, self.repository)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn parse_oci_scheme_with_tag() {
        let r = PackageReference::parse("oci://ghcr.io/defenseunicorns/packages/dos-games:1.0.0")
            .expect("parse");
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "defenseunicorns/packages/dos-games");
        assert_eq!(r.selector, Selector::Tag("1.0.0".into()));
    }

    #[test]
    fn parse_without_scheme_and_with_port() {
        let r = PackageReference::parse("localhost:5000/demo:0.1.0-amd64").expect("parse");
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "demo");
        assert_eq!(r.to_string(), "localhost:5000/demo:0.1.0-amd64");
    }

    #[test]
    fn parse_digest_reference() {
        let r = PackageReference::parse(&format!("oci://registry.example.com/pkg@sha256:{HEX}"))
            .expect("parse");
        assert!(matches!(r.selector, Selector::Digest(ref d) if d.encoded() == HEX));
    }

    #[test]
    fn parse_tagged_digest_reference_keeps_digest() {
        let r = PackageReference::parse(&format!("oci://ghcr.io/org/pkg:1.0.0@sha256:{HEX}"))
            .expect("parse");
        assert_eq!(r.repository, "org/pkg");
        assert!(matches!(r.selector, Selector::Digest(ref d) if d.encoded() == HEX));
        assert_eq!(r.to_string(), format!("ghcr.io/org/pkg@sha256:{HEX}"));
    }

    #[test]
    fn parse_digest_reference_with_registry_port() {
        let r = PackageReference::parse(&format!("localhost:5000/pkg@sha256:{HEX}")).expect("parse");
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "pkg");
    }

    #[test]
    fn parse_rejects_malformed_tag_before_digest() {
        assert!(PackageReference::parse(&format!("ghcr.io/org/pkg:b$d@sha256:{HEX}")).is_err());
        assert!(PackageReference::parse(&format!("ghcr.io/org/pkg:@sha256:{HEX}")).is_err());
    }

    #[test]
    fn parse_rejects_missing_registry() {
        assert!(PackageReference::parse("library/nginx:1.25").is_err());
    }

    #[test]
    fn parse_rejects_missing_tag() {
        assert!(PackageReference::parse("ghcr.io/org/pkg").is_err());
        assert!(PackageReference::parse("localhost:5000/pkg").is_err());
    }

    #[test]
    fn parse_rejects_bad_digest() {
        assert!(PackageReference::parse("ghcr.io/org/pkg@sha256:nothex").is_err());
    }

    #[test]
    fn parse_rejects_uppercase_repository() {
        assert!(PackageReference::parse("ghcr.io/Org/pkg:1.0").is_err());
    }

    #[test]
    fn parse_rejects_empty_path_segment() {
        assert!(PackageReference::parse("ghcr.io/org//pkg:1.0").is_err());
    }
}
