// src/resolver/candidates.rs

//! Candidate ordering for the backtracking search
//!
//! Encodes the minimal-disruption heuristic:
//! - unconstrained packages try the newest version first,
//! - constrained packages try the lowest satisfying version first
//!   (conservative upgrades),
//! - a selection already in the plan that satisfies the constraint is moved
//!   to the front so an already-satisfying choice is never disturbed.

use crate::version::{PackageVersion, VersionConstraint};

/// Sort versions newest-first by the total order
///
/// Literal-class identifiers sort above every numeric release, so they lead
/// the descending list.
pub(crate) fn sort_descending(versions: &mut [PackageVersion]) {
    versions.sort_by(|a, b| b.cmp(a));
}

/// Build the ordered candidate list for a constraint
///
/// `versions` must already be sorted descending. With no constraint the
/// candidates are the full descending list (prefer newest); otherwise they
/// are the satisfying versions in ascending order (prefer lowest).
pub(crate) fn ordered_candidates(
    versions: &[PackageVersion],
    constraint: &VersionConstraint,
) -> Vec<PackageVersion> {
    if constraint.is_any() {
        versions.to_vec()
    } else {
        versions
            .iter()
            .rev()
            .filter(|v| constraint.satisfies(v))
            .cloned()
            .collect()
    }
}

/// Move an already-planned satisfying version to the front
///
/// The current version is prepended even when it is absent from the catalog
/// list: an environment version unknown to the graph can still be retained.
/// Callers check emptiness of `candidates` before this step; an empty list
/// is a conflict regardless of the current selection.
pub(crate) fn prefer_current(
    mut candidates: Vec<PackageVersion>,
    current: &PackageVersion,
    constraint: &VersionConstraint,
) -> Vec<PackageVersion> {
    if !constraint.satisfies(current) {
        return candidates;
    }
    candidates.retain(|v| v != current);
    candidates.insert(0, current.clone());
    candidates
}
