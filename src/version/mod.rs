// src/version/mod.rs

//! Version handling and constraint satisfaction for package dependencies
//!
//! This module provides version parsing and comparison for the version
//! identifiers found in the package graph, plus PEP 440-style constraint
//! sets (`==`, `!=`, `>=`, `<=`, `>`, `<`, `~=`, `===`, and `.*` wildcards).
//!
//! Version parsing is total: identifiers that conform to semver are parsed
//! strictly; all-numeric dotted identifiers (`1.23`, `4.57.2.1`) are parsed
//! as release sequences; anything else is kept as a literal. The resulting
//! order is total and deterministic for every identifier the graph can
//! return, including malformed ones: release-like versions order by their
//! zero-padded numeric components, literals order lexicographically and sort
//! after all release-like versions.

use semver::Prerelease;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Errors produced while parsing a constraint expression
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// Clause has no recognized comparison operator
    #[error("Invalid constraint clause '{0}': missing or unknown operator")]
    UnknownOperator(String),

    /// Operator present but no version to compare against
    #[error("Invalid constraint clause '{0}': missing version")]
    MissingVersion(String),

    /// A `.*` wildcard on an operator that does not allow it
    #[error("Invalid constraint clause '{0}': wildcard is only valid with == and !=")]
    InvalidWildcard(String),

    /// A wildcard prefix that is not a numeric release
    #[error("Invalid constraint clause '{0}': wildcard prefix must be numeric")]
    NonNumericWildcard(String),

    /// `~=` requires a numeric release with at least two components
    #[error("Invalid constraint clause '{0}': ~= requires at least a major.minor release")]
    InvalidCompatible(String),
}

/// How a version identifier was understood by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionKey {
    /// Numeric release, optionally with a semver pre-release tag
    Release {
        release: Vec<u64>,
        pre: Option<Prerelease>,
    },
    /// Identifier that fits no release scheme; ordered by raw bytes
    Literal,
}

/// A parsed package version with a total, deterministic order
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    key: VersionKey,
}

impl PackageVersion {
    /// Parse a version identifier
    ///
    /// Never fails. Resolution order of schemes:
    /// 1. strict semver (`1.2.3`, `1.2.3-rc.1`)
    /// 2. all-numeric dotted release (`1`, `1.23`, `4.57.2.1`)
    /// 3. literal (everything else)
    pub fn parse(s: &str) -> Self {
        let raw = s.trim().to_string();

        if let Ok(v) = semver::Version::parse(&raw) {
            let pre = if v.pre.is_empty() { None } else { Some(v.pre.clone()) };
            return Self {
                key: VersionKey::Release {
                    release: vec![v.major, v.minor, v.patch],
                    pre,
                },
                raw,
            };
        }

        let parts: Vec<&str> = raw.split('.').collect();
        let numeric: Option<Vec<u64>> = parts
            .iter()
            .map(|p| {
                if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) {
                    p.parse::<u64>().ok()
                } else {
                    None
                }
            })
            .collect();

        match numeric {
            Some(release) if !release.is_empty() => Self {
                key: VersionKey::Release { release, pre: None },
                raw,
            },
            _ => Self {
                key: VersionKey::Literal,
                raw,
            },
        }
    }

    /// The identifier exactly as the catalog reported it
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release components, if this version has a release scheme
    fn release(&self) -> Option<&[u64]> {
        match &self.key {
            VersionKey::Release { release, .. } => Some(release),
            VersionKey::Literal => None,
        }
    }

    /// Comparison used by constraint evaluation
    ///
    /// Zero-pads numeric releases so that `1.5` and `1.5.0` compare equal,
    /// matching how the original specifier semantics treat releases. The
    /// total order used for sorting additionally tie-breaks on the raw
    /// string; constraint evaluation must not, or `==1.5` would reject
    /// `1.5.0`.
    fn constraint_cmp(&self, other: &PackageVersion) -> Ordering {
        match (&self.key, &other.key) {
            (
                VersionKey::Release { release: ra, pre: pa },
                VersionKey::Release { release: rb, pre: pb },
            ) => padded_cmp(ra, rb).then_with(|| pre_cmp(pa, pb)),
            (VersionKey::Release { .. }, VersionKey::Literal) => Ordering::Less,
            (VersionKey::Literal, VersionKey::Release { .. }) => Ordering::Greater,
            (VersionKey::Literal, VersionKey::Literal) => self.raw.cmp(&other.raw),
        }
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PackageVersion {}

impl std::hash::Hash for PackageVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Raw tie-break keeps the order consistent with Eq: distinct
        // identifiers never compare Equal even when their releases do.
        self.constraint_cmp(other).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl serde::Serialize for PackageVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Compare numeric releases with implicit zero-padding
fn padded_cmp(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// A release without a pre-release tag sorts above the same release with one
fn pre_cmp(a: &Option<Prerelease>, b: &Option<Prerelease>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    }
}

/// Comparison operators recognized in constraint clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exact,
    NotEqual,
    GreaterOrEqual,
    GreaterThan,
    LessOrEqual,
    LessThan,
    Compatible,
    ArbitraryEqual,
    /// `==X.Y.*` — numeric prefix match
    ExactPrefix,
    /// `!=X.Y.*` — negated numeric prefix match
    NotEqualPrefix,
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Exact | Op::ExactPrefix => "==",
            Op::NotEqual | Op::NotEqualPrefix => "!=",
            Op::GreaterOrEqual => ">=",
            Op::GreaterThan => ">",
            Op::LessOrEqual => "<=",
            Op::LessThan => "<",
            Op::Compatible => "~=",
            Op::ArbitraryEqual => "===",
        }
    }
}

/// A single operator/version clause
#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    op: Op,
    version: PackageVersion,
}

impl Clause {
    fn satisfies(&self, candidate: &PackageVersion) -> bool {
        match self.op {
            Op::Exact => candidate.constraint_cmp(&self.version) == Ordering::Equal,
            Op::NotEqual => candidate.constraint_cmp(&self.version) != Ordering::Equal,
            Op::GreaterOrEqual => candidate.constraint_cmp(&self.version) != Ordering::Less,
            Op::GreaterThan => candidate.constraint_cmp(&self.version) == Ordering::Greater,
            Op::LessOrEqual => candidate.constraint_cmp(&self.version) != Ordering::Greater,
            Op::LessThan => candidate.constraint_cmp(&self.version) == Ordering::Less,
            Op::ArbitraryEqual => candidate.as_str() == self.version.as_str(),
            Op::Compatible => {
                if candidate.constraint_cmp(&self.version) == Ordering::Less {
                    return false;
                }
                // Upper bound: drop the last release component, bump the new
                // last one. ~=1.4.5 means >=1.4.5, <1.5.0.
                let release = self.version.release().unwrap_or(&[]);
                let mut upper: Vec<u64> = release[..release.len() - 1].to_vec();
                if let Some(last) = upper.last_mut() {
                    *last += 1;
                }
                let upper = PackageVersion {
                    raw: String::new(),
                    key: VersionKey::Release { release: upper, pre: None },
                };
                candidate.constraint_cmp(&upper) == Ordering::Less
            }
            Op::ExactPrefix => prefix_matches(candidate, &self.version),
            Op::NotEqualPrefix => !prefix_matches(candidate, &self.version),
        }
    }
}

/// Whether a candidate's release starts with the clause's numeric prefix
fn prefix_matches(candidate: &PackageVersion, prefix: &PackageVersion) -> bool {
    let (Some(cand), Some(pre)) = (candidate.release(), prefix.release()) else {
        return false;
    };
    pre.iter()
        .enumerate()
        .all(|(i, p)| cand.get(i).copied().unwrap_or(0) == *p)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Op::ExactPrefix | Op::NotEqualPrefix => {
                write!(f, "{}{}.*", self.op.symbol(), self.version)
            }
            _ => write!(f, "{}{}", self.op.symbol(), self.version),
        }
    }
}

/// An immutable set of constraint clauses over versions
///
/// The empty set is the always-satisfied constraint. Display is normalized
/// (canonical operator spelling, no whitespace), so two constraints parsed
/// from equivalent input render identically — the resolver keys its visited
/// set on this rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    /// The always-satisfied constraint
    pub fn any() -> Self {
        Self { clauses: Vec::new() }
    }

    /// Parse a comma-separated constraint expression
    ///
    /// An empty (or all-whitespace) expression parses to `any()`.
    pub fn parse(s: &str) -> Result<Self, ConstraintError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::any());
        }

        let mut clauses = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(ConstraintError::UnknownOperator(s.to_string()));
            }
            clauses.push(Self::parse_clause(part)?);
        }
        Ok(Self { clauses })
    }

    fn parse_clause(part: &str) -> Result<Clause, ConstraintError> {
        // Longest operators first so `===` is not read as `==`.
        let (op, rest) = if let Some(rest) = part.strip_prefix("===") {
            (Op::ArbitraryEqual, rest)
        } else if let Some(rest) = part.strip_prefix("==") {
            (Op::Exact, rest)
        } else if let Some(rest) = part.strip_prefix("!=") {
            (Op::NotEqual, rest)
        } else if let Some(rest) = part.strip_prefix(">=") {
            (Op::GreaterOrEqual, rest)
        } else if let Some(rest) = part.strip_prefix("<=") {
            (Op::LessOrEqual, rest)
        } else if let Some(rest) = part.strip_prefix("~=") {
            (Op::Compatible, rest)
        } else if let Some(rest) = part.strip_prefix('>') {
            (Op::GreaterThan, rest)
        } else if let Some(rest) = part.strip_prefix('<') {
            (Op::LessThan, rest)
        } else {
            return Err(ConstraintError::UnknownOperator(part.to_string()));
        };

        let text = rest.trim();
        if text.is_empty() {
            return Err(ConstraintError::MissingVersion(part.to_string()));
        }

        if let Some(prefix) = text.strip_suffix(".*") {
            let op = match op {
                Op::Exact => Op::ExactPrefix,
                Op::NotEqual => Op::NotEqualPrefix,
                _ => return Err(ConstraintError::InvalidWildcard(part.to_string())),
            };
            let version = PackageVersion::parse(prefix);
            if version.release().is_none() {
                return Err(ConstraintError::NonNumericWildcard(part.to_string()));
            }
            return Ok(Clause { op, version });
        }

        let version = PackageVersion::parse(text);
        if op == Op::Compatible {
            match version.release() {
                Some(release) if release.len() >= 2 => {}
                _ => return Err(ConstraintError::InvalidCompatible(part.to_string())),
            }
        }
        Ok(Clause { op, version })
    }

    /// True when this constraint accepts every version
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check whether a version satisfies every clause
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        self.clauses.iter().all(|c| c.satisfies(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in &self.clauses {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}", clause)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s)
    }

    fn c(s: &str) -> VersionConstraint {
        VersionConstraint::parse(s).unwrap()
    }

    #[test]
    fn test_parse_semver() {
        assert!(v("1.2.3").release().is_some());
        assert!(v("1.2.3-rc.1").release().is_some());
    }

    #[test]
    fn test_parse_numeric_release() {
        assert_eq!(v("1.23").release(), Some(&[1, 23][..]));
        assert_eq!(v("4.57.2.1").release(), Some(&[4, 57, 2, 1][..]));
    }

    #[test]
    fn test_parse_literal() {
        assert!(v("2013b").release().is_none());
        assert!(v("1.0.0rc1").release().is_none());
    }

    #[test]
    fn test_numeric_order() {
        assert!(v("1.9") < v("1.23"));
        assert!(v("2.31.0") > v("2.4.1"));
        assert!(v("1.26.0") < v("1.26.18"));
    }

    #[test]
    fn test_prerelease_orders_below_release() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
    }

    #[test]
    fn test_literals_order_above_releases() {
        // Matches the original sort key: unparseable identifiers lead a
        // descending candidate list.
        assert!(v("2013b") > v("99.99.99"));
        assert!(v("abc") < v("abd"));
    }

    #[test]
    fn test_padded_equality_in_constraints() {
        assert!(c("==1.5").satisfies(&v("1.5.0")));
        assert!(c("==1.5.0").satisfies(&v("1.5")));
        assert!(!c("==1.5").satisfies(&v("1.5.1")));
    }

    #[test]
    fn test_order_distinguishes_padded_versions() {
        // Total order stays consistent with Eq even when the release
        // components compare equal.
        assert_ne!(v("1.5"), v("1.5.0"));
        assert_ne!(v("1.5").cmp(&v("1.5.0")), Ordering::Equal);
    }

    #[test]
    fn test_minimum_constraint() {
        let spec = c(">=2.31.0");
        assert!(spec.satisfies(&v("2.31.0")));
        assert!(spec.satisfies(&v("2.32.1")));
        assert!(!spec.satisfies(&v("2.30.0")));
    }

    #[test]
    fn test_compound_constraint() {
        let spec = c(">=1.0.0, <2.0.0");
        assert!(spec.satisfies(&v("1.5.0")));
        assert!(!spec.satisfies(&v("2.0.0")));
        assert!(!spec.satisfies(&v("0.9.0")));
    }

    #[test]
    fn test_compatible_release() {
        let spec = c("~=1.4.5");
        assert!(spec.satisfies(&v("1.4.5")));
        assert!(spec.satisfies(&v("1.4.9")));
        assert!(!spec.satisfies(&v("1.5.0")));
        assert!(!spec.satisfies(&v("1.4.4")));

        let spec = c("~=2.2");
        assert!(spec.satisfies(&v("2.9")));
        assert!(!spec.satisfies(&v("3.0")));
    }

    #[test]
    fn test_wildcard() {
        let spec = c("==1.26.*");
        assert!(spec.satisfies(&v("1.26.0")));
        assert!(spec.satisfies(&v("1.26.18")));
        assert!(!spec.satisfies(&v("1.25.0")));

        let spec = c("!=1.26.*");
        assert!(!spec.satisfies(&v("1.26.0")));
        assert!(spec.satisfies(&v("1.27.0")));
    }

    #[test]
    fn test_not_equal() {
        let spec = c("!=1.25.0");
        assert!(!spec.satisfies(&v("1.25.0")));
        assert!(spec.satisfies(&v("1.25.1")));
    }

    #[test]
    fn test_arbitrary_equality() {
        let spec = c("===2013b");
        assert!(spec.satisfies(&v("2013b")));
        assert!(!spec.satisfies(&v("2013")));
    }

    #[test]
    fn test_empty_constraint_is_any() {
        assert!(c("").is_any());
        assert!(c("  ").is_any());
        assert!(c("").satisfies(&v("anything")));
    }

    #[test]
    fn test_malformed_constraints() {
        assert!(VersionConstraint::parse("1.0.0").is_err());
        assert!(VersionConstraint::parse(">=").is_err());
        assert!(VersionConstraint::parse(">=1.0,,<2.0").is_err());
        assert!(VersionConstraint::parse(">=1.*").is_err());
        assert!(VersionConstraint::parse("~=1").is_err());
        assert!(VersionConstraint::parse("==abc.*").is_err());
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(c(">= 1.26.0").to_string(), ">=1.26.0");
        assert_eq!(c(">=1.0 , <2.0").to_string(), ">=1.0,<2.0");
        assert_eq!(c("==1.26.*").to_string(), "==1.26.*");
        assert_eq!(c("").to_string(), "");
    }
}
