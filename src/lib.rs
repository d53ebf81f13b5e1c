// src/lib.rs

//! pyplan — install planning for Python package environments
//!
//! Given an existing environment (installed package versions), a set of
//! soft requirement-file constraints, and one or more install targets,
//! pyplan finds a consistent assignment of exactly one version per package
//! such that every declared dependency constraint in the induced closure is
//! satisfied — or reports a single actionable reason why it cannot.
//!
//! # Architecture
//!
//! - Graph-backed: package versions and dependency edges live in an external
//!   knowledge graph, consumed read-only through the `PackageGraph` trait
//! - First-feasible backtracking search with minimal-disruption candidate
//!   ordering; no SAT solving, no cost optimization
//! - Three task façades: feasibility check, single install with upgrade,
//!   multi install with upgrade

mod error;
pub mod graph;
pub mod requirement;
pub mod resolver;
pub mod version;

pub use error::{Error, Result};
pub use graph::{DependencyRecord, GraphClient, GraphClientConfig, MemoryGraph, PackageGraph};
pub use resolver::{
    BudgetKind, Conflict, Environment, InstallPlan, PackageSelection, ResolutionResult, Resolver,
    ResolverConfig, SelectionSource,
};
pub use version::{ConstraintError, PackageVersion, VersionConstraint};
