//! Package documents fetched through a resolved root.

use pkgdive_common::constants::{IMAGE_INDEX_PATH, PACKAGE_YAML};
use pkgdive_common::error::{DiveError, FetchError};
use pkgdive_common::types::{ContentDescriptor, ImageIndex, ImageManifest, PackageManifest};
use pkgdive_plan::{BlobLocator, ImageIndexFetcher, ManifestFetcher};
use tracing::{debug, info};

use crate::client::Registry;
use crate::error::Result;
use crate::root::PackageRoot;

impl Registry {
    /// Fetches and decodes the package manifest (`zarf.yaml`).
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingPackageFile` if the root has no package
    /// manifest, or any transport and decoding error.
    pub fn fetch_package_manifest(&self, root: &PackageRoot) -> Result<PackageManifest> {
        let descriptor = root.require(PACKAGE_YAML)?;
        let body = self.fetch_document(&descriptor)?;
        let package = PackageManifest::from_yaml(&body)?;
        debug!(
            name = %package.metadata.name,
            components = package.components.len(),
            "fetched package manifest"
        );
        Ok(package)
    }

    /// Fetches and decodes the package image index.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingPackageFile` if the root has no image
    /// index, or any transport and decoding error.
    pub fn fetch_image_index(&self, root: &PackageRoot) -> Result<ImageIndex> {
        let descriptor = root.require(IMAGE_INDEX_PATH)?;
        let index: ImageIndex = serde_json::from_slice(&self.fetch_document(&descriptor)?)?;
        for entry in &index.manifests {
            debug!(
                image = entry.base_image_name().unwrap_or("<unnamed>"),
                digest = %entry.digest,
                "image in the index"
            );
        }
        Ok(index)
    }

    /// Fetches and decodes the image manifest at `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns any transport and decoding error.
    pub fn fetch_manifest(&self, descriptor: &ContentDescriptor) -> Result<ImageManifest> {
        Ok(serde_json::from_slice(&self.fetch_document(descriptor)?)?)
    }
}

/// A registry client bound to one resolved package root.
///
/// Provides the collaborators the sparse pull planner consumes.
#[derive(Debug, Clone, Copy)]
pub struct PackageSession<'a> {
    registry: &'a Registry,
    root: &'a PackageRoot,
}

impl<'a> PackageSession<'a> {
    /// Binds `registry` to `root`.
    #[must_use]
    pub const fn new(registry: &'a Registry, root: &'a PackageRoot) -> Self {
        Self { registry, root }
    }

    /// Plans the sparse pull of `requested` components.
    ///
    /// # Errors
    ///
    /// Returns `DiveError::RemoteFetch` if the package manifest cannot be
    /// fetched, or any planning error.
    pub fn sparse_pull_plan(
        &self,
        requested: &[String],
    ) -> pkgdive_common::error::Result<Vec<ContentDescriptor>> {
        let package = self
            .registry
            .fetch_package_manifest(self.root)
            .map_err(|e| DiveError::remote_fetch(PACKAGE_YAML, Box::new(e)))?;
        let blobs = pkgdive_plan::resolve(&package, requested, self, self, self)?;
        info!(
            requested = requested.len(),
            blobs = blobs.len(),
            "planned sparse pull"
        );
        Ok(blobs)
    }
}

impl BlobLocator for PackageSession<'_> {
    fn locate(&self, path: &str) -> Option<ContentDescriptor> {
        self.root.locate(path)
    }
}

impl ImageIndexFetcher for PackageSession<'_> {
    fn fetch_image_index(&self) -> std::result::Result<ImageIndex, FetchError> {
        self.registry
            .fetch_image_index(self.root)
            .map_err(FetchError::from)
    }
}

impl ManifestFetcher for PackageSession<'_> {
    fn fetch_manifest(
        &self,
        descriptor: &ContentDescriptor,
    ) -> std::result::Result<ImageManifest, FetchError> {
        debug!(digest = %descriptor.digest, "fetching image manifest");
        self.registry
            .fetch_manifest(descriptor)
            .map_err(FetchError::from)
    }
}
