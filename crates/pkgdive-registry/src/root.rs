//! Package root resolution and blob location.
//!
//! A package root is an OCI manifest whose layers are the package files, each
//! titled with its relative path in the package layout.

use pkgdive_common::types::{ContentDescriptor, ImageIndex, ImageManifest};
use pkgdive_plan::BlobLocator;
use tracing::{debug, info};

use crate::client::{Registry, is_index_media_type};
use crate::error::{RegistryError, Result};

/// Resolved package root: its descriptor and decoded manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    /// Descriptor of the root manifest.
    pub descriptor: ContentDescriptor,
    /// Root manifest; its layers are the package files.
    pub manifest: ImageManifest,
}

impl PackageRoot {
    /// Returns the layer titled `path`, or `None` when the package has no such file.
    #[must_use]
    pub fn locate(&self, path: &str) -> Option<ContentDescriptor> {
        self.manifest
            .layers
            .iter()
            .find(|layer| layer.title() == Some(path))
            .cloned()
    }

    /// Returns the layer titled `path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingPackageFile` when no layer carries that title.
    pub fn require(&self, path: &str) -> Result<ContentDescriptor> {
        self.locate(path)
            .ok_or_else(|| RegistryError::MissingPackageFile {
                path: path.to_string(),
            })
    }

    /// Total size of every package file, in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.manifest.layers.iter().map(|l| l.size).sum()
    }
}

impl BlobLocator for PackageRoot {
    fn locate(&self, path: &str) -> Option<ContentDescriptor> {
        Self::locate(self, path)
    }
}

impl Registry {
    /// Resolves the package root named by this client's reference.
    ///
    /// Multi-platform packages publish an index; the entry matching the
    /// configured platform is selected.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::PlatformNotAvailable` if no index entry matches,
    /// `DigestMismatch` if a digest-pinned reference resolves to other content,
    /// or any transport and decoding error.
    pub fn resolve_root(&self) -> Result<PackageRoot> {
        let selector = self.reference().selector.to_string();
        let (descriptor, body) = self.fetch_tagged_manifest(&selector)?;

        if let crate::reference::Selector::Digest(pinned) = &self.reference().selector {
            if *pinned != descriptor.digest {
                return Err(RegistryError::DigestMismatch {
                    expected: pinned.to_string(),
                    actual: descriptor.digest.to_string(),
                });
            }
        }

        if !is_index_media_type(&descriptor.media_type) {
            let manifest: ImageManifest = serde_json::from_slice(&body)?;
            info!(
                digest = %descriptor.digest,
                layers = manifest.layers.len(),
                "resolved package root"
            );
            return Ok(PackageRoot {
                descriptor,
                manifest,
            });
        }

        let index: ImageIndex = serde_json::from_slice(&body)?;
        let wanted = &self.config().platform;
        let entry = index
            .manifests
            .into_iter()
            .find(|m| m.platform.as_ref().is_some_and(|p| wanted.matches(p)))
            .ok_or_else(|| RegistryError::PlatformNotAvailable {
                reference: self.reference().to_string(),
                platform: wanted.to_string(),
            })?;
        debug!(platform = %wanted, digest = %entry.digest, "selected platform root");

        let manifest: ImageManifest = serde_json::from_slice(&self.fetch_document(&entry)?)?;
        info!(digest = %entry.digest, layers = manifest.layers.len(), "resolved package root");
        Ok(PackageRoot {
            descriptor: entry,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pkgdive_common::constants::{
        ANNOTATION_TITLE, PACKAGE_BLOB_MEDIA_TYPE, PACKAGE_CONFIG_MEDIA_TYPE,
    };
    use pkgdive_common::types::Digest;

    use super::*;

    fn layer(seed: u64, title: &str) -> ContentDescriptor {
        ContentDescriptor::new(
            PACKAGE_BLOB_MEDIA_TYPE,
            Digest::sha256(&format!("{seed:064x}")).expect("digest"),
            seed,
        )
        .with_annotation(ANNOTATION_TITLE, title)
    }

    fn root() -> PackageRoot {
        let config = ContentDescriptor::new(
            PACKAGE_CONFIG_MEDIA_TYPE,
            Digest::sha256(&format!("{:064x}", 99)).expect("digest"),
            99,
        );
        PackageRoot {
            descriptor: config.clone(),
            manifest: ImageManifest {
                schema_version: 2,
                media_type: None,
                config,
                layers: vec![layer(1, "zarf.yaml"), layer(2, "components/init.tar")],
                annotations: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn locate_matches_title_exactly() {
        let root = root();
        assert_eq!(root.locate("zarf.yaml").expect("found").size, 1);
        assert!(root.locate("components/init").is_none());
    }

    #[test]
    fn locate_missing_file_is_none() {
        assert!(root().locate("sboms.tar").is_none());
    }

    #[test]
    fn require_missing_file_is_an_error() {
        assert!(matches!(
            root().require("images/index.json"),
            Err(RegistryError::MissingPackageFile { .. })
        ));
    }

    #[test]
    fn total_size_sums_layers() {
        assert_eq!(root().total_size(), 3);
    }
}
