// src/graph/memory.rs

//! In-memory package graph
//!
//! A `HashMap`-backed catalog used by the test suites and by callers that
//! want to resolve against a locally constructed graph snapshot.

use crate::graph::{DependencyRecord, PackageGraph};
use crate::Result;
use std::collections::HashMap;

/// In-memory implementation of [`PackageGraph`]
#[derive(Debug, Default)]
pub struct MemoryGraph {
    versions: HashMap<String, Vec<String>>,
    dependencies: HashMap<(String, String), Vec<DependencyRecord>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package with its known versions
    pub fn add_package(&mut self, name: &str, versions: &[&str]) {
        self.versions
            .entry(name.to_string())
            .or_default()
            .extend(versions.iter().map(|v| v.to_string()));
    }

    /// Declare a dependency edge of a concrete package version
    pub fn add_dependency(&mut self, name: &str, version: &str, target: &str, constraint: &str) {
        self.add_dependency_with_marker(name, version, target, constraint, "");
    }

    /// Declare a dependency edge carrying an environment marker
    pub fn add_dependency_with_marker(
        &mut self,
        name: &str,
        version: &str,
        target: &str,
        constraint: &str,
        marker: &str,
    ) {
        self.dependencies
            .entry((name.to_string(), version.to_string()))
            .or_default()
            .push(DependencyRecord {
                target: target.to_string(),
                constraint: constraint.to_string(),
                marker: marker.to_string(),
            });
    }
}

impl PackageGraph for MemoryGraph {
    fn versions(&self, package: &str) -> Result<Vec<String>> {
        Ok(self.versions.get(package).cloned().unwrap_or_default())
    }

    fn dependencies(&self, package: &str, version: &str) -> Result<Vec<DependencyRecord>> {
        Ok(self
            .dependencies
            .get(&(package.to_string(), version.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
