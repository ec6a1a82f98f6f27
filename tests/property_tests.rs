//! Property-based tests for core domain types.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::cmp::Ordering;

use proptest::prelude::*;

use docshelf::core::paths;
use docshelf::core::types::BranchName;
use docshelf::core::versions::{compare_versions, VersionKey, VersionRegistry};

/// Strategy for version-like strings: releases, pre-releases, and names.
fn version_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "v?[0-9]{1,3}(\\.[0-9]{1,3}){0,3}",
        "[0-9]{1,2}\\.[0-9]{1,2}(rc|b|a|\\.dev)[0-9]{1,2}",
        "[a-z][a-z0-9_-]{0,10}",
    ]
}

/// Strategy for alias names that are never release-like.
fn alias_string() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,8}"
}

/// Strategy for a registry built through the public API.
fn registry() -> impl Strategy<Value = VersionRegistry> {
    prop::collection::vec(
        (
            version_string(),
            prop::option::of("[A-Za-z0-9 ]{1,12}"),
            prop::collection::vec(alias_string(), 0..3),
        ),
        0..8,
    )
    .prop_map(|specs| {
        let mut registry = VersionRegistry::new();
        for (version, title, aliases) in specs {
            // Collisions are rejected; what remains is a valid registry.
            let _ = registry.add(&version, title.as_deref(), &aliases, false);
        }
        registry
    })
}

/// Strategy for arbitrary relative paths, including awkward characters.
fn tree_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9 _.\"\\\\\n-]{1,8}", 1..4).prop_map(|parts| parts.join("/"))
}

proptest! {
    #[test]
    fn registry_dump_round_trips(registry in registry()) {
        let text = registry.dumps();
        let loaded = VersionRegistry::loads(&text).unwrap();
        prop_assert_eq!(loaded, registry);
    }

    #[test]
    fn registry_iteration_is_sorted(registry in registry()) {
        let versions: Vec<&str> = registry.iter().map(|e| e.version.as_str()).collect();
        for pair in versions.windows(2) {
            prop_assert_ne!(compare_versions(pair[0], pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn aliases_resolve_to_owner(registry in registry()) {
        for entry in registry.iter() {
            prop_assert_eq!(
                registry.find(&entry.version),
                Some(VersionKey::Version(entry.version.clone()))
            );
            for alias in &entry.aliases {
                prop_assert_eq!(registry.find(alias).map(|k| k.version().to_string()),
                    Some(entry.version.clone()));
            }
        }
    }

    #[test]
    fn version_order_is_antisymmetric(a in version_string(), b in version_string()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn quote_round_trips(path in tree_path()) {
        let quoted = paths::quote(&path);
        prop_assert!(!quoted.contains('\n'));
        prop_assert_eq!(paths::unquote(&quoted).unwrap(), path);
    }

    #[test]
    fn sanitized_paths_stay_inside(path in "(\\.\\./|[a-z]{1,3}/|\\./){0,6}") {
        if let Ok(clean) = paths::sanitize(&path) {
            prop_assert!(!clean.starts_with(".."));
            prop_assert!(!clean.starts_with('/'));
            prop_assert_eq!(paths::sanitize(&clean).unwrap(), clean.clone());
        }
    }

    #[test]
    fn valid_branch_names_display_unchanged(name in "[a-z]{1,8}(/[a-z0-9-]{1,8}){0,2}") {
        let branch = BranchName::new(name.clone()).unwrap();
        prop_assert_eq!(branch.to_string(), name);
    }
}
