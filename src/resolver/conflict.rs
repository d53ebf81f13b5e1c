// src/resolver/conflict.rs

//! Conflict types for dependency resolution
//!
//! Defines the structured reasons a resolution can fail. Conflicts are
//! outcomes, not errors: they travel inside `ResolutionResult` and render
//! as single human-readable strings on the wire.

/// What the search ran out of when a budget was exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    /// Selections entered into plans
    PlanPackages,
    /// Pending constraints ever enqueued
    QueueEntries,
}

impl std::fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetKind::PlanPackages => write!(f, "planned packages"),
            BudgetKind::QueueEntries => write!(f, "queued constraints"),
        }
    }
}

/// A structured reason why no plan could be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// A constraint expression could not be parsed
    MalformedConstraint { input: String, detail: String },

    /// The graph knows no versions at all for a referenced package
    NoVersions { package: String },

    /// Versions exist, but none satisfies the constraint
    NoSatisfyingVersion { package: String, constraint: String },

    /// A version already chosen during this search fails a later constraint
    IncompatibleSelection {
        package: String,
        selected: String,
        constraint: String,
    },

    /// Every candidate version of the package led to a failed sub-search
    ExhaustedCandidates { package: String },

    /// An installed package fails its own stated requirement (check task)
    PriorRequirementConflict {
        package: String,
        installed: String,
        constraint: String,
    },

    /// A search ceiling was breached; the resolution was aborted, not refuted
    SearchBudgetExceeded { kind: BudgetKind, limit: usize },
}

impl Conflict {
    /// Whether this conflict reports budget exhaustion rather than a genuine
    /// infeasibility
    ///
    /// Callers may react differently, e.g. by suggesting a narrower request.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, Conflict::SearchBudgetExceeded { .. })
    }

    /// The package this conflict names, when it names one
    pub fn package(&self) -> Option<&str> {
        match self {
            Conflict::NoVersions { package }
            | Conflict::NoSatisfyingVersion { package, .. }
            | Conflict::IncompatibleSelection { package, .. }
            | Conflict::ExhaustedCandidates { package }
            | Conflict::PriorRequirementConflict { package, .. } => Some(package.as_str()),
            Conflict::MalformedConstraint { .. } | Conflict::SearchBudgetExceeded { .. } => None,
        }
    }
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::MalformedConstraint { input, detail } => {
                write!(f, "Malformed constraint '{}': {}", input, detail)
            }
            Conflict::NoVersions { package } => {
                write!(f, "{}: no versions available in the dependency graph", package)
            }
            Conflict::NoSatisfyingVersion { package, constraint } => {
                write!(f, "{}: no version satisfies {}", package, constraint)
            }
            Conflict::IncompatibleSelection {
                package,
                selected,
                constraint,
            } => write!(
                f,
                "{}: selected version {} does not satisfy {}",
                package, selected, constraint
            ),
            Conflict::ExhaustedCandidates { package } => {
                write!(f, "{}: every candidate version leads to a dependency conflict", package)
            }
            Conflict::PriorRequirementConflict {
                package,
                installed,
                constraint,
            } => write!(
                f,
                "{}: installed version {} does not satisfy requirement {}",
                package, installed, constraint
            ),
            Conflict::SearchBudgetExceeded { kind, limit } => {
                write!(f, "Search budget exceeded: more than {} {}", limit, kind)
            }
        }
    }
}
