//! Content descriptors and package documents exchanged across the workspace.
//!
//! Every value here is an immutable snapshot: documents are decoded once per
//! invocation and never updated in place.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ANNOTATION_BASE_IMAGE_NAME, ANNOTATION_TITLE, SHA256_ALGORITHM, SHA256_HEX_LENGTH,
};
use crate::error::{DiveError, Result};

/// Content digest in `algorithm:encoded` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    encoded: String,
}

impl Digest {
    /// Parses a digest string such as `sha256:<hex>`.
    ///
    /// # Errors
    ///
    /// Returns `DiveError::InvalidDigest` if the string is not a well-formed
    /// digest, or if a SHA-256 digest is not 64 lowercase hex characters.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || DiveError::InvalidDigest {
            value: value.to_string(),
        };
        let (algorithm, encoded) = value.split_once(':').ok_or_else(invalid)?;

        let algorithm_ok = !algorithm.is_empty()
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c));
        let encoded_ok = !encoded.is_empty()
            && encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "=_-".contains(c));
        if !algorithm_ok || !encoded_ok {
            return Err(invalid());
        }
        if algorithm == SHA256_ALGORITHM
            && (encoded.len() != SHA256_HEX_LENGTH
                || !encoded
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)))
        {
            return Err(invalid());
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            encoded: encoded.to_string(),
        })
    }

    /// Builds a SHA-256 digest from its hex encoding.
    ///
    /// # Errors
    ///
    /// Returns `DiveError::InvalidDigest` if `hex` is not 64 lowercase hex characters.
    pub fn sha256(hex: &str) -> Result<Self> {
        Self::parse(&format!("{SHA256_ALGORITHM}:{hex}"))
    }

    /// Returns the algorithm part (e.g. `sha256`).
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the encoded part, used to key blob paths.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}

impl FromStr for Digest {
    type Err = DiveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = DiveError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

/// Target platform of an image or package root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// CPU architecture in OCI spelling (`amd64`, `arm64`, ...).
    pub architecture: String,
    /// Operating system.
    pub os: String,
    /// Optional architecture variant (`v7`, `v8`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    /// Returns the platform of the running host.
    #[must_use]
    pub fn host() -> Self {
        let architecture = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "arm" => "arm",
            other => other,
        };
        Self {
            architecture: architecture.to_string(),
            os: "linux".to_string(),
            variant: None,
        }
    }

    /// Checks whether `other` satisfies this platform.
    ///
    /// A missing variant on either side matches any variant.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.os == other.os
            && self.architecture == other.architecture
            && match (&self.variant, &other.variant) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

impl FromStr for Platform {
    type Err = DiveError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(os), Some(arch), variant, None) if !os.is_empty() && !arch.is_empty() => {
                Ok(Self {
                    architecture: arch.to_string(),
                    os: os.to_string(),
                    variant: variant.filter(|v| !v.is_empty()).map(str::to_string),
                })
            }
            _ => Err(DiveError::Config {
                message: format!("invalid platform {s:?}, expected os/arch[/variant]"),
            }),
        }
    }
}

/// Addressable blob: digest, size, media type, and annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    /// Media type of the referenced content.
    pub media_type: String,
    /// Digest of the referenced content.
    pub digest: Digest,
    /// Size of the referenced content in bytes.
    pub size: u64,
    /// Arbitrary annotations (title, base image name, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Platform of the referenced manifest, set on index entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl ContentDescriptor {
    /// Creates a descriptor without annotations.
    #[must_use]
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest,
            size,
            annotations: BTreeMap::new(),
            platform: None,
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.annotations.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of this descriptor carrying a different media type.
    #[must_use]
    pub fn retyped(&self, media_type: &str) -> Self {
        Self {
            media_type: media_type.to_string(),
            ..self.clone()
        }
    }

    /// Looks up an annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Relative path of a package layer (`org.opencontainers.image.title`).
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.annotation(ANNOTATION_TITLE)
    }

    /// Image reference of an index entry (`org.opencontainers.image.base.name`).
    #[must_use]
    pub fn base_image_name(&self) -> Option<&str> {
        self.annotation(ANNOTATION_BASE_IMAGE_NAME)
    }
}

const fn default_schema_version() -> u32 {
    2
}

/// OCI image index: the manifests available in an image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    /// Schema version (always 2).
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Media type of the index document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Indexed manifests in declared order.
    #[serde(default)]
    pub manifests: Vec<ContentDescriptor>,
    /// Index annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// OCI image manifest: one config blob and ordered layer blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version (always 2).
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Media type of the manifest document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Config blob.
    pub config: ContentDescriptor,
    /// Layer blobs, bottom to top.
    #[serde(default)]
    pub layers: Vec<ContentDescriptor>,
    /// Manifest annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Package metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name.
    #[serde(default)]
    pub name: String,
    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named, optionally mandatory unit of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Name, unique within the package.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the component is always deployed.
    #[serde(default)]
    pub required: bool,
    /// Image references in declared order.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Component {
    /// Creates a component with no images.
    #[must_use]
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            ..Self::default()
        }
    }

    /// Appends an image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.images.push(image.into());
        self
    }
}

/// Package manifest (`zarf.yaml`) as published in the package root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package kind.
    #[serde(default)]
    pub kind: String,
    /// Package metadata.
    #[serde(default)]
    pub metadata: PackageMetadata,
    /// Components in declaration order.
    #[serde(default)]
    pub components: Vec<Component>,
}

impl PackageManifest {
    /// Decodes a package manifest from YAML.
    ///
    /// # Errors
    ///
    /// Returns `DiveError::Yaml` if the document cannot be decoded.
    pub fn from_yaml(content: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn digest_parse_splits_algorithm_and_encoded() {
        let digest = Digest::parse(&format!("sha256:{HEX}")).expect("parse");
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(digest.encoded(), HEX);
        assert_eq!(digest.to_string(), format!("sha256:{HEX}"));
    }

    #[test]
    fn digest_rejects_short_sha256() {
        assert!(Digest::parse("sha256:abc").is_err());
    }

    #[test]
    fn digest_rejects_uppercase_sha256() {
        assert!(Digest::sha256(&HEX.to_uppercase()).is_err());
    }

    #[test]
    fn digest_rejects_missing_separator() {
        assert!(Digest::parse(HEX).is_err());
    }

    #[test]
    fn digest_accepts_other_algorithms() {
        let digest = Digest::parse("sha512:abcDEF").expect("parse");
        assert_eq!(digest.algorithm(), "sha512");
    }

    #[test]
    fn descriptor_decodes_oci_json() {
        let json = format!(
            r#"{{
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:{HEX}",
                "size": 528,
                "annotations": {{"org.opencontainers.image.base.name": "docker.io/library/nginx:1.25"}}
            }}"#
        );
        let desc: ContentDescriptor = serde_json::from_str(&json).expect("decode");
        assert_eq!(desc.size, 528);
        assert_eq!(desc.base_image_name(), Some("docker.io/library/nginx:1.25"));
        assert!(desc.title().is_none());
    }

    #[test]
    fn descriptor_with_bad_digest_fails_to_decode() {
        let json = r#"{"mediaType": "x", "digest": "sha256:nothex", "size": 1}"#;
        assert!(serde_json::from_str::<ContentDescriptor>(json).is_err());
    }

    #[test]
    fn retyped_descriptor_leaves_original_untouched() {
        let original = ContentDescriptor::new("a", Digest::sha256(HEX).expect("digest"), 7)
            .with_annotation("k", "v");
        let copy = original.retyped("b");
        assert_eq!(original.media_type, "a");
        assert_eq!(copy.media_type, "b");
        assert_eq!(copy.digest, original.digest);
        assert_eq!(copy.annotations, original.annotations);
    }

    #[test]
    fn platform_parses_os_arch_variant() {
        let platform: Platform = "linux/arm64/v8".parse().expect("parse");
        assert_eq!(platform.os, "linux");
        assert_eq!(platform.architecture, "arm64");
        assert_eq!(platform.variant.as_deref(), Some("v8"));
        assert_eq!(platform.to_string(), "linux/arm64/v8");
    }

    #[test]
    fn platform_rejects_single_segment() {
        assert!("linux".parse::<Platform>().is_err());
    }

    #[test]
    fn platform_without_variant_matches_any_variant() {
        let wanted: Platform = "linux/arm64".parse().expect("parse");
        let offered: Platform = "linux/arm64/v8".parse().expect("parse");
        assert!(wanted.matches(&offered));
        assert!(!wanted.matches(&"linux/amd64".parse().expect("parse")));
    }

    #[test]
    fn package_manifest_decodes_yaml() {
        let yaml = r"
kind: ZarfPackageConfig
metadata:
  name: demo
  version: 0.1.0
components:
  - name: init
    required: true
    images:
      - ghcr.io/example/agent:1.0
  - name: docs
    description: optional docs
    files:
      - source: README.md
";
        let pkg = PackageManifest::from_yaml(yaml.as_bytes()).expect("decode");
        assert_eq!(pkg.metadata.name, "demo");
        assert_eq!(pkg.components.len(), 2);
        assert!(pkg.components[0].required);
        assert_eq!(pkg.components[0].images, vec!["ghcr.io/example/agent:1.0"]);
        assert!(!pkg.components[1].required);
        assert!(pkg.components[1].images.is_empty());
    }

    #[test]
    fn package_manifest_rejects_malformed_yaml() {
        let err = PackageManifest::from_yaml(b"components: {name: [").expect_err("malformed");
        assert!(matches!(err, DiveError::Yaml { .. }));
    }
}
