// src/resolver/engine.rs

//! Dependency resolver implementation
//!
//! The backtracking search at the core of install planning. The search is
//! depth-first and chronological: pending constraints are consumed from a
//! FIFO queue, each constraint tries its candidate versions in order, and
//! the first complete assignment wins. A failed candidate is rolled back by
//! construction — every attempt works on its own copy of the plan and
//! queue, so partial mutations can never leak into a sibling attempt.
//!
//! Failure classes are kept distinct:
//! - branch failures (no versions, nothing satisfies, pinned selection
//!   mismatch, all candidates exhausted) make the parent try its next
//!   candidate;
//! - aborts (malformed constraint in the graph, search budget exceeded)
//!   unwind the whole search into a failed result;
//! - graph faults propagate as errors — "could not determine" is never
//!   conflated with "determined infeasible".

use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::requirement::normalize_name;
use crate::version::{PackageVersion, VersionConstraint};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tracing::{debug, info, warn};

use super::candidates;
use super::conflict::{BudgetKind, Conflict};
use super::plan::{Environment, InstallPlan, PackageSelection, ResolutionResult, SelectionSource};

/// Default ceiling on selections entered into plans per resolution
pub const DEFAULT_MAX_PLAN_PACKAGES: usize = 800;

/// Default ceiling on pending constraints enqueued per resolution
pub const DEFAULT_MAX_QUEUE_ENTRIES: usize = 2000;

/// Guardrail ceilings for a single resolution
///
/// Both counters are monotone over the whole top-level call and checked
/// before each expansion. They bound worst-case blow-up on highly branchy
/// or cyclic graphs; they are a safety valve, not a correctness mechanism.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub max_plan_packages: usize,
    pub max_queue_entries: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_plan_packages: DEFAULT_MAX_PLAN_PACKAGES,
            max_queue_entries: DEFAULT_MAX_QUEUE_ENTRIES,
        }
    }
}

/// One obligation waiting to be satisfied by the search
#[derive(Debug, Clone)]
pub(crate) struct PendingConstraint {
    pub(crate) package: String,
    pub(crate) constraint: VersionConstraint,
    /// Diagnostic tag ("target", "req", "dep-of-<name>"); never affects
    /// search decisions
    pub(crate) origin: String,
}

impl PendingConstraint {
    pub(crate) fn new(package: String, constraint: VersionConstraint, origin: impl Into<String>) -> Self {
        Self {
            package,
            constraint,
            origin: origin.into(),
        }
    }
}

/// Install planner over a package graph
pub struct Resolver<G> {
    graph: G,
    config: ResolverConfig,
}

impl<G: PackageGraph> Resolver<G> {
    /// Create a resolver with default guardrail ceilings
    pub fn new(graph: G) -> Self {
        Self::with_config(graph, ResolverConfig::default())
    }

    /// Create a resolver with explicit guardrail ceilings
    pub fn with_config(graph: G, config: ResolverConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Run one top-level resolution
    ///
    /// Owns all search state for the call: plan, queue, visited set, and
    /// the per-call lookup caches. Nothing is shared across invocations.
    pub(crate) fn resolve(
        &self,
        env: &Environment,
        targets: Vec<PendingConstraint>,
    ) -> Result<ResolutionResult> {
        let initial_env: BTreeMap<String, PackageVersion> = env
            .iter()
            .map(|(name, version)| (normalize_name(name), PackageVersion::parse(version)))
            .collect();

        let mut initial_plan = InstallPlan::new();
        for (name, version) in &initial_env {
            initial_plan.seed(PackageSelection {
                name: name.clone(),
                version: version.clone(),
                source: SelectionSource::Existing,
            });
        }

        info!(
            targets = targets.len(),
            environment = initial_plan.len(),
            "starting resolution"
        );

        let queue: VecDeque<PendingConstraint> = targets.into();
        let mut search = Search {
            graph: &self.graph,
            config: &self.config,
            initial_env: &initial_env,
            version_cache: HashMap::new(),
            dependency_cache: HashMap::new(),
            planned_total: 0,
            enqueued_total: queue.len(),
        };

        match search.explore(queue, initial_plan.clone(), HashSet::new()) {
            Ok(BranchOutcome::Solved(plan)) => {
                info!(selections = plan.len(), "resolution succeeded");
                Ok(ResolutionResult::solved(plan))
            }
            Ok(BranchOutcome::Conflicted(conflict)) => {
                info!(%conflict, "resolution failed");
                Ok(ResolutionResult::failed(initial_plan, conflict))
            }
            Err(SearchHalt::Aborted(conflict)) => {
                warn!(%conflict, "resolution aborted");
                Ok(ResolutionResult::failed(initial_plan, conflict))
            }
            Err(SearchHalt::Graph(e)) => Err(e),
        }
    }
}

/// How one branch of the search ended
enum BranchOutcome {
    Solved(InstallPlan),
    Conflicted(Conflict),
}

/// Conditions that end the whole search instead of one branch
enum SearchHalt {
    Aborted(Conflict),
    Graph(Error),
}

/// A dependency edge after marker filtering and constraint parsing
struct ParsedEdge {
    target: String,
    constraint: VersionConstraint,
}

/// State owned by a single in-flight resolution
struct Search<'a, G> {
    graph: &'a G,
    config: &'a ResolverConfig,
    /// The caller's environment as supplied — selection sources are derived
    /// against this map, not against intermediate plans
    initial_env: &'a BTreeMap<String, PackageVersion>,
    version_cache: HashMap<String, Rc<Vec<PackageVersion>>>,
    dependency_cache: HashMap<(String, String), Rc<Vec<ParsedEdge>>>,
    /// Selections ever entered into any plan (monotone)
    planned_total: usize,
    /// Pending constraints ever enqueued, initial targets included (monotone)
    enqueued_total: usize,
}

impl<G: PackageGraph> Search<'_, G> {
    /// Depth-first search over the pending-constraint queue
    ///
    /// `visited` flows down the recursion only: children see the parent's
    /// pairs plus their own, siblings never see each other's.
    fn explore(
        &mut self,
        mut queue: VecDeque<PendingConstraint>,
        plan: InstallPlan,
        mut visited: HashSet<(String, String)>,
    ) -> std::result::Result<BranchOutcome, SearchHalt> {
        if self.planned_total > self.config.max_plan_packages {
            return Err(SearchHalt::Aborted(Conflict::SearchBudgetExceeded {
                kind: BudgetKind::PlanPackages,
                limit: self.config.max_plan_packages,
            }));
        }
        if self.enqueued_total > self.config.max_queue_entries {
            return Err(SearchHalt::Aborted(Conflict::SearchBudgetExceeded {
                kind: BudgetKind::QueueEntries,
                limit: self.config.max_queue_entries,
            }));
        }

        let Some(pending) = queue.pop_front() else {
            return Ok(BranchOutcome::Solved(plan));
        };

        let key = (pending.package.clone(), pending.constraint.to_string());
        if visited.contains(&key) {
            // This exact obligation was already processed on this path.
            // Skipping it is a no-op pass-through, not a failure: it breaks
            // dependency cycles and duplicate edges.
            debug!(
                package = %pending.package,
                constraint = %pending.constraint,
                origin = %pending.origin,
                "constraint already visited, skipping"
            );
            return self.explore(queue, plan, visited);
        }
        visited.insert(key);

        // A selection the engine made earlier in this search is pinned: a
        // later constraint either accepts it or fails the branch, sending
        // the search back into the earlier chooser's candidate loop. Seeded
        // environment entries are not pinned — revising them is the upgrade
        // path.
        if plan.is_resolved(&pending.package) {
            let selected = plan.get(&pending.package).map(|s| s.version.clone());
            if let Some(version) = selected {
                if pending.constraint.satisfies(&version) {
                    debug!(
                        package = %pending.package,
                        version = %version,
                        "pinned selection satisfies constraint"
                    );
                    return self.explore(queue, plan, visited);
                }
                return Ok(BranchOutcome::Conflicted(Conflict::IncompatibleSelection {
                    package: pending.package.clone(),
                    selected: version.as_str().to_string(),
                    constraint: pending.constraint.to_string(),
                }));
            }
        }

        let versions = self.versions(&pending.package)?;
        if versions.is_empty() {
            return Ok(BranchOutcome::Conflicted(Conflict::NoVersions {
                package: pending.package.clone(),
            }));
        }

        let candidates = candidates::ordered_candidates(&versions, &pending.constraint);
        if candidates.is_empty() {
            return Ok(BranchOutcome::Conflicted(Conflict::NoSatisfyingVersion {
                package: pending.package.clone(),
                constraint: pending.constraint.to_string(),
            }));
        }

        let candidates = match plan.get(&pending.package) {
            Some(current) => {
                candidates::prefer_current(candidates, &current.version, &pending.constraint)
            }
            None => candidates,
        };

        for candidate in candidates {
            let source = self.selection_source(&pending.package, &candidate);
            let mut next_plan = plan.clone();
            next_plan.select(PackageSelection {
                name: pending.package.clone(),
                version: candidate.clone(),
                source,
            });
            self.planned_total += 1;

            let edges = self.dependencies(&pending.package, &candidate)?;
            let mut next_queue = queue.clone();
            for edge in edges.iter() {
                next_queue.push_back(PendingConstraint::new(
                    edge.target.clone(),
                    edge.constraint.clone(),
                    format!("dep-of-{}", pending.package),
                ));
                self.enqueued_total += 1;
            }

            debug!(
                package = %pending.package,
                version = %candidate,
                source = %source,
                origin = %pending.origin,
                dependencies = edges.len(),
                "trying candidate"
            );

            match self.explore(next_queue, next_plan, visited.clone())? {
                BranchOutcome::Solved(plan) => return Ok(BranchOutcome::Solved(plan)),
                BranchOutcome::Conflicted(conflict) => {
                    debug!(
                        package = %pending.package,
                        version = %candidate,
                        %conflict,
                        "candidate failed, backtracking"
                    );
                }
            }
        }

        // Deeper conflict reasons are deliberately not aggregated: the
        // shallowest unresolved package makes the single actionable message.
        Ok(BranchOutcome::Conflicted(Conflict::ExhaustedCandidates {
            package: pending.package.clone(),
        }))
    }

    /// Fetch (or recall) the sorted version list of a package
    fn versions(
        &mut self,
        package: &str,
    ) -> std::result::Result<Rc<Vec<PackageVersion>>, SearchHalt> {
        if let Some(cached) = self.version_cache.get(package) {
            return Ok(cached.clone());
        }
        let raw = self.graph.versions(package).map_err(SearchHalt::Graph)?;
        let mut parsed: Vec<PackageVersion> =
            raw.iter().map(|s| PackageVersion::parse(s)).collect();
        candidates::sort_descending(&mut parsed);
        let versions = Rc::new(parsed);
        self.version_cache
            .insert(package.to_string(), versions.clone());
        Ok(versions)
    }

    /// Fetch (or recall) the retained dependency edges of a package version
    ///
    /// Optional-extra edges are dropped here; constraint expressions are
    /// parsed once and cached. A malformed expression aborts the search —
    /// it is graph data the engine cannot reason about.
    fn dependencies(
        &mut self,
        package: &str,
        version: &PackageVersion,
    ) -> std::result::Result<Rc<Vec<ParsedEdge>>, SearchHalt> {
        let key = (package.to_string(), version.as_str().to_string());
        if let Some(cached) = self.dependency_cache.get(&key) {
            return Ok(cached.clone());
        }

        let records = self
            .graph
            .dependencies(package, version.as_str())
            .map_err(SearchHalt::Graph)?;

        let mut edges = Vec::new();
        for record in records {
            if record.is_optional_extra() {
                debug!(
                    package,
                    version = version.as_str(),
                    target = %record.target,
                    "dropping optional-extra dependency"
                );
                continue;
            }
            let constraint = VersionConstraint::parse(&record.constraint).map_err(|e| {
                SearchHalt::Aborted(Conflict::MalformedConstraint {
                    input: record.constraint.clone(),
                    detail: e.to_string(),
                })
            })?;
            edges.push(ParsedEdge {
                target: normalize_name(&record.target),
                constraint,
            });
        }

        let edges = Rc::new(edges);
        self.dependency_cache.insert(key, edges.clone());
        Ok(edges)
    }

    /// Derive the provenance tag from the initial environment
    fn selection_source(&self, package: &str, version: &PackageVersion) -> SelectionSource {
        match self.initial_env.get(package) {
            None => SelectionSource::New,
            Some(prior) if prior == version => SelectionSource::Existing,
            Some(_) => SelectionSource::Upgrade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryGraph;

    fn target(name: &str, spec: &str) -> PendingConstraint {
        PendingConstraint::new(
            name.to_string(),
            VersionConstraint::parse(spec).unwrap(),
            "target",
        )
    }

    #[test]
    fn test_install_with_transitive_dependency() {
        let mut graph = MemoryGraph::new();
        graph.add_package("fastapi", &["0.110.0", "0.100.0"]);
        graph.add_package("starlette", &["0.36.0", "0.27.0"]);
        graph.add_dependency("fastapi", "0.100.0", "starlette", ">=0.27.0");

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("fastapi", ">=0.100.0")])
            .unwrap();

        assert!(result.ok);
        // Lowest satisfying version of the target, lowest satisfying dep.
        assert_eq!(result.plan.get("fastapi").unwrap().version.as_str(), "0.100.0");
        assert_eq!(result.plan.get("starlette").unwrap().version.as_str(), "0.27.0");
        assert_eq!(
            result.plan.get("starlette").unwrap().source,
            SelectionSource::New
        );
    }

    #[test]
    fn test_backtracks_to_higher_candidate() {
        // lib's first obligation pins its lowest satisfying version; a later
        // dependency edge rejects that pin, so the search must back up into
        // lib's candidate loop and take the higher version instead of
        // silently revising the pinned choice.
        let mut graph = MemoryGraph::new();
        graph.add_package("app", &["1.0.0"]);
        graph.add_package("lib", &["2.0.0", "2.5.0"]);
        graph.add_dependency("app", "1.0.0", "lib", ">=2.5.0");

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(
                &Environment::new(),
                vec![target("lib", ">=2.0.0"), target("app", ">=1.0.0")],
            )
            .unwrap();

        assert!(result.ok);
        assert_eq!(result.plan.get("lib").unwrap().version.as_str(), "2.5.0");
    }

    #[test]
    fn test_pinned_selection_conflict_fails() {
        let mut graph = MemoryGraph::new();
        graph.add_package("pkga", &["1.0.0", "2.0.0"]);

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(
                &Environment::new(),
                vec![target("pkga", ">=2.0.0"), target("pkga", "==1.0.0")],
            )
            .unwrap();

        assert!(!result.ok);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].package(), Some("pkga"));
    }

    #[test]
    fn test_cycle_is_broken_by_visited_pass_through() {
        let mut graph = MemoryGraph::new();
        graph.add_package("a", &["1.0.0"]);
        graph.add_package("b", &["1.0.0"]);
        graph.add_dependency("a", "1.0.0", "b", ">=1.0.0");
        graph.add_dependency("b", "1.0.0", "a", ">=1.0.0");

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("a", ">=1.0.0")])
            .unwrap();

        assert!(result.ok);
        assert_eq!(result.plan.len(), 2);
    }

    #[test]
    fn test_optional_extra_edges_are_dropped() {
        let mut graph = MemoryGraph::new();
        graph.add_package("requests", &["2.31.0"]);
        // The socks extra would be unresolvable; it must never be queued.
        graph.add_dependency_with_marker(
            "requests",
            "2.31.0",
            "pysocks",
            ">=1.5.6",
            "extra == \"socks\"",
        );

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("requests", ">=2.31.0")])
            .unwrap();

        assert!(result.ok);
        assert!(result.plan.get("pysocks").is_none());
    }

    #[test]
    fn test_no_versions_is_a_conflict() {
        let graph = MemoryGraph::new();
        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("ghost", ">=1.0.0")])
            .unwrap();

        assert!(!result.ok);
        assert!(matches!(
            result.conflicts[0],
            Conflict::NoVersions { .. }
        ));
    }

    #[test]
    fn test_malformed_graph_constraint_aborts() {
        let mut graph = MemoryGraph::new();
        graph.add_package("app", &["1.0.0"]);
        graph.add_package("lib", &["1.0.0"]);
        graph.add_dependency("app", "1.0.0", "lib", "bogus");

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("app", ">=1.0.0")])
            .unwrap();

        assert!(!result.ok);
        assert!(matches!(
            result.conflicts[0],
            Conflict::MalformedConstraint { .. }
        ));
    }

    #[test]
    fn test_dependency_target_names_are_normalized() {
        let mut graph = MemoryGraph::new();
        graph.add_package("app", &["1.0.0"]);
        graph.add_package("typing-extensions", &["4.8.0"]);
        graph.add_dependency("app", "1.0.0", "Typing_Extensions", ">=4.0.0");

        let resolver = Resolver::new(graph);
        let result = resolver
            .resolve(&Environment::new(), vec![target("app", "==1.0.0")])
            .unwrap();

        assert!(result.ok);
        assert!(result.plan.get("typing-extensions").is_some());
    }
}
