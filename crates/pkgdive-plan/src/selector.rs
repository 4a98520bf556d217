//! Component selection.
//!
//! The effective set is every requested component plus every required one,
//! in package declaration order, each at most once.

use std::collections::HashSet;

use pkgdive_common::error::{DiveError, Result};
use pkgdive_common::types::{Component, PackageManifest};

/// Computes the effective components for `requested`.
///
/// # Errors
///
/// Returns `DiveError::ComponentNotFound` for the first requested name that
/// matches no component, and `DiveError::Config` if the package declares the
/// same component name twice.
pub fn select<'a>(
    package: &'a PackageManifest,
    requested: &[String],
) -> Result<Vec<&'a Component>> {
    let mut declared = HashSet::with_capacity(package.components.len());
    for component in &package.components {
        if !declared.insert(component.name.as_str()) {
            return Err(DiveError::Config {
                message: format!("component {} is declared more than once", component.name),
            });
        }
    }

    if let Some(missing) = requested.iter().find(|name| !declared.contains(name.as_str())) {
        return Err(DiveError::ComponentNotFound {
            name: missing.clone(),
        });
    }

    Ok(package
        .components
        .iter()
        .filter(|c| c.required || requested.contains(&c.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> PackageManifest {
        PackageManifest {
            components: vec![
                Component::new("a", true),
                Component::new("b", false),
                Component::new("c", false),
            ],
            ..PackageManifest::default()
        }
    }

    fn names(components: &[&Component]) -> Vec<String> {
        components.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn select_empty_request_returns_required_only() {
        let pkg = package();
        let selected = select(&pkg, &[]).expect("select");
        assert_eq!(names(&selected), vec!["a"]);
    }

    #[test]
    fn select_keeps_declaration_order() {
        let pkg = package();
        let selected = select(&pkg, &["c".into(), "b".into()]).expect("select");
        assert_eq!(names(&selected), vec!["a", "b", "c"]);
    }

    #[test]
    fn select_required_and_requested_appears_once() {
        let pkg = package();
        let selected = select(&pkg, &["a".into(), "a".into()]).expect("select");
        assert_eq!(names(&selected), vec!["a"]);
    }

    #[test]
    fn select_unknown_name_fails_with_that_name() {
        let pkg = package();
        let err = select(&pkg, &["b".into(), "z".into()]).expect_err("should fail");
        assert!(matches!(err, DiveError::ComponentNotFound { ref name } if name == "z"));
    }

    #[test]
    fn select_reports_first_unknown_name() {
        let pkg = package();
        let err = select(&pkg, &["x".into(), "y".into()]).expect_err("should fail");
        assert!(matches!(err, DiveError::ComponentNotFound { ref name } if name == "x"));
    }

    #[test]
    fn select_matches_names_exactly() {
        let pkg = package();
        assert!(select(&pkg, &["B".into()]).is_err());
        assert!(select(&pkg, &[" b".into()]).is_err());
    }

    #[test]
    fn select_rejects_duplicate_component_names() {
        let mut pkg = package();
        pkg.components.push(Component::new("b", true));
        assert!(matches!(
            select(&pkg, &[]),
            Err(DiveError::Config { .. })
        ));
    }

    #[test]
    fn select_no_components_and_no_request_is_empty() {
        let pkg = PackageManifest::default();
        assert!(select(&pkg, &[]).expect("select").is_empty());
    }
}
