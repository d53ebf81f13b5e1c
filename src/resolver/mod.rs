// src/resolver/mod.rs

//! Install planning and conflict detection
//!
//! This module answers whether desired package installs/upgrades can coexist
//! with an existing environment under the dependency graph, and produces a
//! concrete version-selection plan when they can.
//!
//! Entry points, all on [`Resolver`]:
//! - [`Resolver::check_single`] — pure feasibility check for one new
//!   package; pre-existing requirement violations fail fast.
//! - [`Resolver::install_single_with_upgrade`] — plan one install, upgrading
//!   installed packages where needed.
//! - [`Resolver::install_multi_with_upgrade`] — the same for several
//!   targets at once.
//!
//! The search is first-feasible, not cost-optimal: candidates are ordered
//! for minimal disruption (keep satisfying selections, prefer the lowest
//! satisfying upgrade, prefer the newest version for free choices) and the
//! first complete assignment is returned.

mod candidates;
mod conflict;
mod engine;
mod plan;
mod tasks;

pub use conflict::{BudgetKind, Conflict};
pub use engine::{Resolver, ResolverConfig, DEFAULT_MAX_PLAN_PACKAGES, DEFAULT_MAX_QUEUE_ENTRIES};
pub use plan::{Environment, InstallPlan, PackageSelection, ResolutionResult, SelectionSource};
