//! Common test utilities for appsvc-stacks
//!
//! - Resolvers over the bundled catalog revisions
//! - Enumeration of every catalog key for property tests

#![allow(dead_code)]

use appsvc_core::{AppKind, Os};
use appsvc_stacks::{CatalogRegistry, StackResolver};

pub const CURRENT_API_VERSION: &str = "2020-06-01";
pub const LEGACY_API_VERSION: &str = "2020-05-01";

/// Resolver over a bundled catalog revision
pub fn resolver(api_version: &str) -> StackResolver {
    let registry = CatalogRegistry::embedded().expect("bundled catalog loads");
    StackResolver::new(registry.catalog(api_version).expect("revision exists"))
}

/// A `(kind, stack, major, minor, os)` key that resolves in the catalog
#[derive(Debug, Clone)]
pub struct CatalogKey {
    pub kind: AppKind,
    pub stack: String,
    pub major: String,
    pub minor: String,
    pub os: Os,
}

/// Every resolvable key of a resolver's catalog, hidden entries included
pub fn all_keys(resolver: &StackResolver) -> Vec<CatalogKey> {
    let mut keys = Vec::new();
    for kind in AppKind::ALL {
        for stack in resolver.catalog().stacks(kind) {
            for (major, minor) in stack.minors() {
                for (os, _) in minor.platforms.iter() {
                    keys.push(CatalogKey {
                        kind,
                        stack: stack.value.clone(),
                        major: major.value.clone(),
                        minor: minor.value.clone(),
                        os,
                    });
                }
            }
        }
    }
    keys
}

/// Every `(kind, stack)` pair of a resolver's catalog
pub fn all_stacks(resolver: &StackResolver) -> Vec<(AppKind, String)> {
    AppKind::ALL
        .into_iter()
        .flat_map(|kind| {
            resolver
                .catalog()
                .stacks(kind)
                .iter()
                .map(move |s| (kind, s.value.clone()))
        })
        .collect()
}
