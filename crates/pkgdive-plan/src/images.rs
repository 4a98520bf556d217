//! Image reference collection.

use indexmap::IndexSet;
use pkgdive_common::types::Component;

/// Collects the image references used by `components`.
///
/// Duplicates are dropped; the first occurrence fixes the position, so the
/// result follows component order and then each component's image order.
#[must_use]
pub fn collect(components: &[&Component]) -> IndexSet<String> {
    components
        .iter()
        .flat_map(|c| c.images.iter().cloned())
        .collect()
}
