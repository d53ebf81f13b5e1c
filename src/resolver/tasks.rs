// src/resolver/tasks.rs

//! Task façades over the resolution engine
//!
//! The three request-shaping entry points. All of them translate a caller's
//! environment, requirement lines, and install targets into the initial
//! plan/queue pair the engine consumes; they differ only in how that pair is
//! built and how strictly pre-existing requirement violations are treated.
//!
//! Every failure in the conflict taxonomy folds into an `ok=false` result
//! with a single reason; `Err` is reserved for graph-service faults.

use crate::graph::PackageGraph;
use crate::requirement::{normalize_name, parse_requirement_lines, Requirement, RequirementError};
use crate::version::{PackageVersion, VersionConstraint};
use crate::Result;
use tracing::info;

use super::conflict::Conflict;
use super::engine::{PendingConstraint, Resolver};
use super::plan::{Environment, InstallPlan, ResolutionResult};

impl<G: PackageGraph> Resolver<G> {
    /// Check whether a single new package can be installed as-is
    ///
    /// Requirement conflicts among already-installed packages are not
    /// something this task tries to fix: any installed package that fails
    /// its stated requirement short-circuits into a
    /// `PriorRequirementConflict` without consulting the graph at all.
    pub fn check_single<S: AsRef<str>>(
        &self,
        env: &Environment,
        requirement_lines: &[S],
        package: &str,
        constraint: &str,
    ) -> Result<ResolutionResult> {
        let requirements = match parse_requirements(requirement_lines) {
            Ok(reqs) => reqs,
            Err(conflict) => return Ok(pre_search_failure(conflict)),
        };
        let env = normalize_env(env);

        for req in &requirements {
            if req.constraint.is_any() {
                continue;
            }
            if let Some(installed) = env.get(&req.name) {
                if !req.constraint.satisfies(&PackageVersion::parse(installed)) {
                    info!(
                        package = %req.name,
                        installed = %installed,
                        constraint = %req.constraint,
                        "installed version violates stated requirement"
                    );
                    return Ok(pre_search_failure(Conflict::PriorRequirementConflict {
                        package: req.name.clone(),
                        installed: installed.clone(),
                        constraint: req.constraint.to_string(),
                    }));
                }
            }
        }

        let constraint = match parse_constraint(constraint) {
            Ok(c) => c,
            Err(conflict) => return Ok(pre_search_failure(conflict)),
        };
        let targets = vec![PendingConstraint::new(
            normalize_name(package),
            constraint,
            "target",
        )];
        self.resolve(&env, targets)
    }

    /// Plan the install of a single new package, upgrading the environment
    /// where necessary
    ///
    /// Requirement-file constraints are queued only for packages that are
    /// already installed; treating every requirement entry as an implicit
    /// install target would explode the search space.
    pub fn install_single_with_upgrade<S: AsRef<str>>(
        &self,
        env: &Environment,
        requirement_lines: &[S],
        package: &str,
        min_constraint: &str,
    ) -> Result<ResolutionResult> {
        let requirements = match parse_requirements(requirement_lines) {
            Ok(reqs) => reqs,
            Err(conflict) => return Ok(pre_search_failure(conflict)),
        };
        let env = normalize_env(env);

        let constraint = match parse_constraint(min_constraint) {
            Ok(c) => c,
            Err(conflict) => return Ok(pre_search_failure(conflict)),
        };
        let mut targets = vec![PendingConstraint::new(
            normalize_name(package),
            constraint,
            "target",
        )];
        queue_installed_requirements(&mut targets, &requirements, &env);
        self.resolve(&env, targets)
    }

    /// Plan the install of several new packages, upgrading the environment
    /// where necessary
    pub fn install_multi_with_upgrade<S: AsRef<str>>(
        &self,
        env: &Environment,
        requirement_lines: &[S],
        new_packages: &[(String, String)],
    ) -> Result<ResolutionResult> {
        let requirements = match parse_requirements(requirement_lines) {
            Ok(reqs) => reqs,
            Err(conflict) => return Ok(pre_search_failure(conflict)),
        };
        let env = normalize_env(env);

        let mut targets = Vec::with_capacity(new_packages.len());
        for (name, spec) in new_packages {
            let constraint = match parse_constraint(spec) {
                Ok(c) => c,
                Err(conflict) => return Ok(pre_search_failure(conflict)),
            };
            targets.push(PendingConstraint::new(
                normalize_name(name),
                constraint,
                "target",
            ));
        }
        queue_installed_requirements(&mut targets, &requirements, &env);
        self.resolve(&env, targets)
    }
}

/// Append a "req" constraint for each requirement on an installed package
fn queue_installed_requirements(
    targets: &mut Vec<PendingConstraint>,
    requirements: &[Requirement],
    env: &Environment,
) {
    for req in requirements {
        if env.contains_key(&req.name) && !req.constraint.is_any() {
            targets.push(PendingConstraint::new(
                req.name.clone(),
                req.constraint.clone(),
                "req",
            ));
        }
    }
}

/// Normalize environment keys to the graph's name scheme
fn normalize_env(env: &Environment) -> Environment {
    env.iter()
        .map(|(name, version)| (normalize_name(name), version.clone()))
        .collect()
}

fn parse_requirements<S: AsRef<str>>(
    lines: &[S],
) -> std::result::Result<Vec<Requirement>, Conflict> {
    parse_requirement_lines(lines.iter().map(|l| l.as_ref())).map_err(requirement_conflict)
}

fn parse_constraint(spec: &str) -> std::result::Result<VersionConstraint, Conflict> {
    VersionConstraint::parse(spec).map_err(|e| Conflict::MalformedConstraint {
        input: spec.to_string(),
        detail: e.to_string(),
    })
}

fn requirement_conflict(err: RequirementError) -> Conflict {
    match err {
        RequirementError::Constraint { line, source } => Conflict::MalformedConstraint {
            input: line,
            detail: source.to_string(),
        },
        RequirementError::InvalidName(line) => Conflict::MalformedConstraint {
            input: line,
            detail: "expected a package name".to_string(),
        },
        RequirementError::UnterminatedExtras(line) => Conflict::MalformedConstraint {
            input: line,
            detail: "unterminated extras".to_string(),
        },
    }
}

/// Failure detected before the search starts; no plan was attempted
fn pre_search_failure(conflict: Conflict) -> ResolutionResult {
    ResolutionResult::failed(InstallPlan::new(), conflict)
}
