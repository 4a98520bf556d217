//! Formatted output helpers for the plan.
//!
//! Provides the descriptor table, the JSON rendering, and human-readable
//! byte formatting.

use pkgdive_common::types::ContentDescriptor;

/// Hex characters of a digest shown in the table.
const SHORT_DIGEST_LEN: usize = 12;

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Pretty JSON for a single descriptor, used in error messages.
#[must_use]
pub fn to_json(descriptor: &ContentDescriptor) -> String {
    serde_json::to_string_pretty(descriptor).unwrap_or_else(|_| descriptor.digest.to_string())
}

/// Renders the plan as a JSON array of OCI descriptors.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(blobs: &[ContentDescriptor]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(blobs)
}

/// Renders the plan as an aligned table: media type, short digest, size, title.
#[must_use]
pub fn render_table(blobs: &[ContentDescriptor]) -> String {
    let rows: Vec<(&str, String, String, &str)> = blobs
        .iter()
        .map(|b| {
            let encoded = b.digest.encoded();
            let short = &encoded[..encoded.len().min(SHORT_DIGEST_LEN)];
            (
                b.media_type.as_str(),
                format!("{}:{short}", b.digest.algorithm()),
                format_bytes(b.size),
                b.title().unwrap_or("-"),
            )
        })
        .collect();

    let media_width = rows
        .iter()
        .map(|(media_type, ..)| media_type.len())
        .max()
        .unwrap_or(0)
        .max("MEDIA TYPE".len());
    let size_width = rows
        .iter()
        .map(|(_, _, size, _)| size.len())
        .max()
        .unwrap_or(0)
        .max("SIZE".len());

    let mut table = format!(
        "{:<media_width$}  {:<19}  {:<size_width$}  TITLE",
        "MEDIA TYPE", "DIGEST", "SIZE"
    );
    for (media_type, digest, size, title) in rows {
        table.push('\n');
        table.push_str(&format!(
            "{media_type:<media_width$}  {digest:<19}  {size:<size_width$}  {title}"
        ));
    }
    table
}

/// One-line summary: blob count and planned size against the full package.
#[must_use]
pub fn summary(blobs: &[ContentDescriptor], package_size: u64) -> String {
    let planned: u64 = blobs.iter().map(|b| b.size).sum();
    format!(
        "{} blob(s), {} of {} in the package",
        blobs.len(),
        format_bytes(planned),
        format_bytes(package_size)
    )
}
