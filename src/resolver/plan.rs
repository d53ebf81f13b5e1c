// src/resolver/plan.rs

//! Resolution plan data structures
//!
//! Contains the result types for install planning: per-package selections
//! with provenance, the plan map itself, and the `ResolutionResult`
//! returned to callers. The wire shape is fixed: `ok`, a `plan` mapping of
//! `name -> {version, source}`, and `conflicts` as human-readable strings.

use super::conflict::Conflict;
use crate::version::PackageVersion;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// The caller's currently-installed package-to-version mapping
pub type Environment = BTreeMap<String, String>;

/// How a selected version relates to the initial environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    /// Already installed at this exact version
    Existing,
    /// Not previously installed
    New,
    /// Installed at a different version
    Upgrade,
}

impl std::fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionSource::Existing => write!(f, "existing"),
            SelectionSource::New => write!(f, "new"),
            SelectionSource::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// One package pinned to one version, with provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSelection {
    pub name: String,
    pub version: PackageVersion,
    pub source: SelectionSource,
}

/// The (partial or final) package-to-version assignment
///
/// At most one entry per package. Entries the engine actively selected
/// during the current search are tracked separately from environment
/// carry-overs: an engine-made selection must not be silently revised by a
/// later constraint, while a carried-over entry may be upgraded freely.
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    selections: BTreeMap<String, PackageSelection>,
    resolved: BTreeSet<String>,
}

impl InstallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry from the caller's environment
    pub(crate) fn seed(&mut self, selection: PackageSelection) {
        self.selections.insert(selection.name.clone(), selection);
    }

    /// Enter a selection the engine has actively made
    pub(crate) fn select(&mut self, selection: PackageSelection) {
        self.resolved.insert(selection.name.clone());
        self.selections.insert(selection.name.clone(), selection);
    }

    /// Whether the engine actively selected this package during the search
    pub(crate) fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&PackageSelection> {
        self.selections.get(name)
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Iterate selections in name order
    pub fn iter(&self) -> impl Iterator<Item = &PackageSelection> {
        self.selections.values()
    }
}

impl Serialize for InstallPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            version: &'a PackageVersion,
            source: SelectionSource,
        }

        let mut map = serializer.serialize_map(Some(self.selections.len()))?;
        for selection in self.selections.values() {
            map.serialize_entry(
                &selection.name,
                &Entry {
                    version: &selection.version,
                    source: selection.source,
                },
            )?;
        }
        map.end()
    }
}

/// Outcome of one top-level resolution
///
/// Constructed once per resolve call and immutable afterwards. `conflicts`
/// is empty on success and carries exactly one reason on failure.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub ok: bool,
    pub plan: InstallPlan,
    pub conflicts: Vec<Conflict>,
}

impl ResolutionResult {
    pub(crate) fn solved(plan: InstallPlan) -> Self {
        Self {
            ok: true,
            plan,
            conflicts: Vec::new(),
        }
    }

    pub(crate) fn failed(plan: InstallPlan, conflict: Conflict) -> Self {
        Self {
            ok: false,
            plan,
            conflicts: vec![conflict],
        }
    }
}

impl Serialize for ResolutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResolutionResult", 3)?;
        state.serialize_field("ok", &self.ok)?;
        state.serialize_field("plan", &self.plan)?;
        let conflicts: Vec<String> = self.conflicts.iter().map(|c| c.to_string()).collect();
        state.serialize_field("conflicts", &conflicts)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(name: &str, version: &str, source: SelectionSource) -> PackageSelection {
        PackageSelection {
            name: name.to_string(),
            version: PackageVersion::parse(version),
            source,
        }
    }

    #[test]
    fn test_select_overwrites_and_pins() {
        let mut plan = InstallPlan::new();
        plan.seed(selection("numpy", "1.23.0", SelectionSource::Existing));
        assert!(!plan.is_resolved("numpy"));

        plan.select(selection("numpy", "1.24.0", SelectionSource::Upgrade));
        assert!(plan.is_resolved("numpy"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get("numpy").unwrap().version.as_str(), "1.24.0");
    }

    #[test]
    fn test_wire_serialization() {
        let mut plan = InstallPlan::new();
        plan.seed(selection("numpy", "1.23.0", SelectionSource::Existing));
        plan.select(selection("requests", "2.31.0", SelectionSource::New));

        let result = ResolutionResult::solved(plan);
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["ok"], true);
        assert_eq!(wire["plan"]["numpy"]["version"], "1.23.0");
        assert_eq!(wire["plan"]["numpy"]["source"], "existing");
        assert_eq!(wire["plan"]["requests"]["source"], "new");
        assert_eq!(wire["conflicts"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_failed_result_carries_one_conflict() {
        let result = ResolutionResult::failed(
            InstallPlan::new(),
            Conflict::ExhaustedCandidates {
                package: "pkga".to_string(),
            },
        );
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["ok"], false);
        assert_eq!(wire["conflicts"].as_array().unwrap().len(), 1);
        assert!(wire["conflicts"][0].as_str().unwrap().contains("pkga"));
    }
}
