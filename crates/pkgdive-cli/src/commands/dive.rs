//! `pkgdive <source>`: resolve a package and print its sparse pull plan.

use anyhow::{Context, bail};
use pkgdive_registry::{PackageReference, PackageSession, Registry};
use tracing::info;

use crate::commands::Cli;
use crate::output;

/// Executes the dive.
///
/// Resolves the package root, checks that its config blob exists, then plans
/// the sparse pull of the requested components and prints it to stdout.
///
/// # Errors
///
/// Returns an error if the source is invalid, the registry cannot be reached,
/// the config blob is missing, or planning fails.
#[allow(clippy::print_stdout)]
pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let reference = PackageReference::parse(&cli.source)?;
    let registry = Registry::new(reference, config)?;

    let root = registry
        .resolve_root()
        .context("failed to resolve root")?;

    let config_descriptor = &root.manifest.config;
    let exists = registry
        .exists(config_descriptor)
        .with_context(|| format!("config DNE {}", output::to_json(config_descriptor)))?;
    if !exists {
        bail!("config DNE {}", output::to_json(config_descriptor));
    }

    info!(
        "{}@{} has {} layers",
        cli.source,
        config_descriptor.digest,
        root.manifest.layers.len()
    );

    let blobs = PackageSession::new(&registry, &root)
        .sparse_pull_plan(&cli.components)
        .context("failed to get layers from requested components")?;

    let rendered = if cli.json {
        output::render_json(&blobs)?
    } else {
        output::render_table(&blobs)
    };
    println!("{rendered}");
    if !cli.json {
        println!("{}", output::summary(&blobs, root.total_size()));
    }
    Ok(())
}
