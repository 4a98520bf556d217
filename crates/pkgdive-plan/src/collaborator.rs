//! Read-only collaborators consumed by the closure builder.
//!
//! Implementations live in the transport layer; the planner only sees these
//! traits, which keeps it free of network and logging concerns.

use pkgdive_common::error::FetchError;
use pkgdive_common::types::{ContentDescriptor, ImageIndex, ImageManifest};

/// Maps a well-known relative path to the package blob stored there.
pub trait BlobLocator {
    /// Returns the descriptor at `path`, or `None` if the package has no such blob.
    fn locate(&self, path: &str) -> Option<ContentDescriptor>;
}

/// Fetches the package's shared image index.
pub trait ImageIndexFetcher {
    /// Fetches and decodes the image index document.
    ///
    /// # Errors
    ///
    /// Returns the transport failure unchanged; retries are the implementor's job.
    fn fetch_image_index(&self) -> Result<ImageIndex, FetchError>;
}

/// Fetches image manifests addressed by descriptor.
pub trait ManifestFetcher {
    /// Fetches and decodes the manifest at `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns the transport failure unchanged; retries are the implementor's job.
    fn fetch_manifest(&self, descriptor: &ContentDescriptor) -> Result<ImageManifest, FetchError>;
}

impl<T: BlobLocator + ?Sized> BlobLocator for &T {
    fn locate(&self, path: &str) -> Option<ContentDescriptor> {
        (**self).locate(path)
    }
}

impl<T: ImageIndexFetcher + ?Sized> ImageIndexFetcher for &T {
    fn fetch_image_index(&self) -> Result<ImageIndex, FetchError> {
        (**self).fetch_image_index()
    }
}

impl<T: ManifestFetcher + ?Sized> ManifestFetcher for &T {
    fn fetch_manifest(&self, descriptor: &ContentDescriptor) -> Result<ImageManifest, FetchError> {
        (**self).fetch_manifest(descriptor)
    }
}
