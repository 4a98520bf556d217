//! Well-known package paths, media types, and annotation keys.
//!
//! The relative paths must match the published package layout byte for byte.

/// Directory holding one tarball per component.
pub const COMPONENTS_DIR: &str = "components";

/// SBOM tarball bundled with the package.
pub const SBOM_TAR: &str = "sboms.tar";

/// Package manifest declaring the components.
pub const PACKAGE_YAML: &str = "zarf.yaml";

/// OCI image index listing every image shipped with the package.
pub const IMAGE_INDEX_PATH: &str = "images/index.json";

/// OCI layout marker of the image store.
pub const IMAGE_LAYOUT_PATH: &str = "images/oci-layout";

/// Directory holding image manifests, configs, and layers by encoded digest.
pub const IMAGE_BLOBS_DIR: &str = "images/blobs/sha256";

/// Media type under which packaged blobs (including image manifests) are stored.
pub const PACKAGE_BLOB_MEDIA_TYPE: &str = "application/vnd.zarf.layer.v1.blob";

/// Media type of the package root manifest config.
pub const PACKAGE_CONFIG_MEDIA_TYPE: &str = "application/vnd.zarf.config.v1+json";

/// OCI image manifest media type.
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// OCI image index media type.
pub const OCI_INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";

/// Annotation carrying the image reference an index entry was built from.
pub const ANNOTATION_BASE_IMAGE_NAME: &str = "org.opencontainers.image.base.name";

/// Annotation carrying the relative path of a package layer.
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// Digest algorithm used for every packaged blob.
pub const SHA256_ALGORITHM: &str = "sha256";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Application name used in CLI output.
pub const APP_NAME: &str = "pkgdive";

/// Relative path of a component's tarball.
#[must_use]
pub fn component_tarball_path(name: &str) -> String {
    format!("{COMPONENTS_DIR}/{name}.tar")
}

/// Relative path of an image blob keyed by its encoded digest.
#[must_use]
pub fn image_blob_path(encoded_digest: &str) -> String {
    format!("{IMAGE_BLOBS_DIR}/{encoded_digest}")
}
