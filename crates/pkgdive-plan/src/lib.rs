//! # pkgdive-plan
//!
//! Computes the minimal set of content blobs needed to materialize a
//! selection of a package's components (a sparse pull).
//!
//! Handles:
//! - **Selector**: Validates requested names and computes the effective components.
//! - **Images**: Collects the ordered, deduplicated image references they use.
//! - **Closure**: Resolves images through the package image index and assembles
//!   the ordered descriptor list.
//! - **Collaborators**: Traits for the blob locator and the index/manifest fetchers.
//!
//! Planning is pure and synchronous: it performs no I/O of its own and no
//! logging, and any failure aborts the whole plan.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn demo(
//! #     package: &pkgdive_common::types::PackageManifest,
//! #     session: &(impl pkgdive_plan::BlobLocator
//! #         + pkgdive_plan::ImageIndexFetcher
//! #         + pkgdive_plan::ManifestFetcher),
//! # ) -> pkgdive_common::error::Result<()> {
//! let requested = ["logging".to_string()];
//! let blobs = pkgdive_plan::resolve(package, &requested, session, session, session)?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod closure;
pub mod collaborator;
pub mod images;
pub mod selector;

use pkgdive_common::error::Result;
use pkgdive_common::types::{ContentDescriptor, PackageManifest};

pub use crate::collaborator::{BlobLocator, ImageIndexFetcher, ManifestFetcher};

/// Plans a sparse pull of `requested` components.
///
/// Chains component selection, image collection, and closure building.
/// Unknown component names fail before any collaborator is called.
///
/// # Errors
///
/// Returns the first selection, lookup, or fetch error; no partial list is
/// ever returned.
pub fn resolve(
    package: &PackageManifest,
    requested: &[String],
    locator: &impl BlobLocator,
    index_fetcher: &impl ImageIndexFetcher,
    manifest_fetcher: &impl ManifestFetcher,
) -> Result<Vec<ContentDescriptor>> {
    let components = selector::select(package, requested)?;
    let images = images::collect(&components);
    closure::build(
        &components,
        &images,
        locator,
        index_fetcher,
        manifest_fetcher,
    )
}
