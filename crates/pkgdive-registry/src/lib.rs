//! # pkgdive-registry
//!
//! Blocking OCI registry transport for pkgdive.
//!
//! Handles:
//! - **Reference**: Parsing `oci://registry/repository:tag` package sources.
//! - **Client**: Authenticated, retried requests with verified document downloads.
//! - **Root**: Resolving the package root and locating package files by title.
//! - **Session**: Package manifest, image index, and image manifest fetchers
//!   wired into the sparse pull planner.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod auth;
pub mod client;
pub mod error;
pub mod reference;
pub mod root;
pub mod session;

pub use crate::client::Registry;
pub use crate::error::{RegistryError, Result};
pub use crate::reference::PackageReference;
pub use crate::root::PackageRoot;
pub use crate::session::PackageSession;
