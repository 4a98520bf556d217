//! Blob closure assembly.
//!
//! Phases run strictly in order because each one depends on documents fetched
//! by the previous one:
//!
//! 1. one tarball per effective component,
//! 2. the SBOM tarball, when the package ships one,
//! 3. the image index and OCI layout markers, when any image is referenced,
//! 4. per image: manifest, config, then every layer in manifest order.
//!
//! Any failure aborts the build and no descriptor escapes.

use std::collections::HashMap;

use indexmap::IndexSet;
use pkgdive_common::constants::{
    IMAGE_INDEX_PATH, IMAGE_LAYOUT_PATH, PACKAGE_BLOB_MEDIA_TYPE, SBOM_TAR, component_tarball_path,
    image_blob_path,
};
use pkgdive_common::error::{DiveError, Result};
use pkgdive_common::types::{Component, ContentDescriptor, ImageIndex};

use crate::collaborator::{BlobLocator, ImageIndexFetcher, ManifestFetcher};

/// Builds the ordered descriptor list for `components` and their `images`.
///
/// # Errors
///
/// - `DiveError::BlobNotFound` if a mandatory package blob cannot be located.
/// - `DiveError::RemoteFetch` if the index or a manifest cannot be fetched.
/// - `DiveError::ImageNotFound` if an image has no entry in the index.
/// - `DiveError::MalformedIndex` if an image has several entries in the index.
pub fn build(
    components: &[&Component],
    images: &IndexSet<String>,
    locator: &impl BlobLocator,
    index_fetcher: &impl ImageIndexFetcher,
    manifest_fetcher: &impl ManifestFetcher,
) -> Result<Vec<ContentDescriptor>> {
    let mut blobs = components
        .iter()
        .map(|c| locate_required(locator, &component_tarball_path(&c.name)))
        .collect::<Result<Vec<_>>>()?;

    // Always pulled regardless of the selection; it is small next to image layers.
    if let Some(sbom) = locator.locate(SBOM_TAR) {
        blobs.push(sbom);
    }

    if images.is_empty() {
        return Ok(blobs);
    }

    blobs.push(locate_required(locator, IMAGE_INDEX_PATH)?);
    blobs.push(locate_required(locator, IMAGE_LAYOUT_PATH)?);

    let index = index_fetcher
        .fetch_image_index()
        .map_err(|e| DiveError::remote_fetch("images index", e))?;
    let lookup = IndexLookup::new(&index);

    for reference in images {
        let entry = lookup.find(reference)?;
        blobs.extend(image_closure(reference, entry, locator, manifest_fetcher)?);
    }

    Ok(blobs)
}

/// Resolves one image to its manifest, config, and layer blobs.
fn image_closure(
    reference: &str,
    entry: &ContentDescriptor,
    locator: &impl BlobLocator,
    manifest_fetcher: &impl ManifestFetcher,
) -> Result<Vec<ContentDescriptor>> {
    // Packaged image manifests are stored as plain blobs, not registry manifests.
    let blob = entry.retyped(PACKAGE_BLOB_MEDIA_TYPE);
    let manifest = manifest_fetcher
        .fetch_manifest(&blob)
        .map_err(|e| DiveError::remote_fetch(format!("manifest for {reference:?}"), e))?;

    let mut blobs = Vec::with_capacity(manifest.layers.len() + 2);
    blobs.push(locate_required(
        locator,
        &image_blob_path(blob.digest.encoded()),
    )?);
    blobs.push(locate_required(
        locator,
        &image_blob_path(manifest.config.digest.encoded()),
    )?);
    for layer in &manifest.layers {
        blobs.push(locate_required(
            locator,
            &image_blob_path(layer.digest.encoded()),
        )?);
    }
    Ok(blobs)
}

fn locate_required(locator: &impl BlobLocator, path: &str) -> Result<ContentDescriptor> {
    locator.locate(path).ok_or_else(|| DiveError::BlobNotFound {
        path: path.to_string(),
    })
}

/// Index entries grouped by base-image name, built once per plan.
struct IndexLookup<'a> {
    by_name: HashMap<&'a str, Vec<&'a ContentDescriptor>>,
}

impl<'a> IndexLookup<'a> {
    fn new(index: &'a ImageIndex) -> Self {
        let mut by_name: HashMap<&str, Vec<&ContentDescriptor>> = HashMap::new();
        for entry in &index.manifests {
            if let Some(name) = entry.base_image_name() {
                by_name.entry(name).or_default().push(entry);
            }
        }
        Self { by_name }
    }

    fn find(&self, reference: &str) -> Result<&'a ContentDescriptor> {
        match self.by_name.get(reference).map(Vec::as_slice) {
            Some(&[entry]) => Ok(entry),
            Some(entries) if entries.len() > 1 => Err(DiveError::MalformedIndex {
                reference: reference.to_string(),
                matches: entries.len(),
            }),
            _ => Err(DiveError::ImageNotFound {
                reference: reference.to_string(),
            }),
        }
    }
}
