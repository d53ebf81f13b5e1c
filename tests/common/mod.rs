// tests/common/mod.rs

//! Shared fixtures for resolution integration tests.

use pyplan::{DependencyRecord, Environment, MemoryGraph, PackageGraph};

/// Catalog around requests/urllib3 used by several scenarios.
///
/// requests 2.31.0 depends on urllib3>=1.26.0; urllib3 ships versions both
/// below and above that bound; numpy exists only in environments, never in
/// the catalog.
pub fn web_stack_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    graph.add_package("requests", &["2.31.0", "2.30.0"]);
    graph.add_package("urllib3", &["1.25.0", "1.26.0", "1.26.18"]);
    graph.add_dependency("requests", "2.31.0", "urllib3", ">=1.26.0");
    graph.add_dependency("requests", "2.30.0", "urllib3", ">=1.25.0");
    graph
}

pub fn environment(entries: &[(&str, &str)]) -> Environment {
    entries
        .iter()
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

/// Graph stub that fails the test if the resolver touches it.
pub struct UnreachableGraph;

impl PackageGraph for UnreachableGraph {
    fn versions(&self, package: &str) -> pyplan::Result<Vec<String>> {
        panic!("graph queried for versions of '{}'", package);
    }

    fn dependencies(&self, package: &str, version: &str) -> pyplan::Result<Vec<DependencyRecord>> {
        panic!("graph queried for dependencies of '{}@{}'", package, version);
    }
}
