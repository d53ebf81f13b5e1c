// src/requirement.rs

//! Requirements-file parsing
//!
//! Parses pip-style requirement lines (`name[extras]<specifier>; marker`)
//! into normalized package names and version constraints. Extras and
//! environment markers are accepted and ignored — only the name and the
//! specifier participate in resolution.

use crate::version::{ConstraintError, VersionConstraint};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors produced while parsing requirement lines
#[derive(Debug, Error)]
pub enum RequirementError {
    /// Line does not start with a valid package name
    #[error("Invalid requirement '{0}': expected a package name")]
    InvalidName(String),

    /// Extras bracket opened but never closed
    #[error("Invalid requirement '{0}': unterminated extras")]
    UnterminatedExtras(String),

    /// The specifier portion failed to parse
    #[error("Invalid requirement '{line}': {source}")]
    Constraint {
        line: String,
        #[source]
        source: ConstraintError,
    },
}

impl From<RequirementError> for crate::Error {
    fn from(e: RequirementError) -> Self {
        crate::Error::ParseError(e.to_string())
    }
}

/// A single parsed requirement line
#[derive(Debug, Clone)]
pub struct Requirement {
    /// Normalized package name
    pub name: String,
    /// Parsed specifier; `any()` when the line carried none
    pub constraint: VersionConstraint,
}

/// Normalize a package name for use as a join key
///
/// Trim, lowercase, and map underscores to hyphens — the normalization the
/// graph was built with, so lookups must match it exactly.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Parse requirement lines into an ordered list
///
/// Blank lines and `#` comments are skipped. A name that appears twice keeps
/// its first position but takes the last constraint, mirroring map-insertion
/// semantics of requirement files.
pub fn parse_requirement_lines<'a, I>(lines: I) -> Result<Vec<Requirement>, RequirementError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut requirements: Vec<Requirement> = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let requirement = parse_requirement(line)?;
        match requirements.iter_mut().find(|r| r.name == requirement.name) {
            Some(existing) => existing.constraint = requirement.constraint,
            None => requirements.push(requirement),
        }
    }

    Ok(requirements)
}

/// Parse one requirement line
pub fn parse_requirement(line: &str) -> Result<Requirement, RequirementError> {
    // Environment markers are ignored at requirement level.
    let body = line.split(';').next().unwrap_or("").trim();

    let name_end = body
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.'))
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() || !name.chars().next().unwrap_or(' ').is_ascii_alphanumeric() {
        return Err(RequirementError::InvalidName(line.to_string()));
    }

    let mut rest = body[name_end..].trim_start();
    if rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => return Err(RequirementError::UnterminatedExtras(line.to_string())),
        }
    }

    let constraint = VersionConstraint::parse(rest).map_err(|source| {
        RequirementError::Constraint {
            line: line.to_string(),
            source,
        }
    })?;

    Ok(Requirement {
        name: normalize_name(name),
        constraint,
    })
}

/// Read a requirements file into its raw lines
pub fn load_requirement_lines(path: &Path) -> crate::Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| crate::Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::PackageVersion;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Typing_Extensions "), "typing-extensions");
        assert_eq!(normalize_name("requests"), "requests");
    }

    #[test]
    fn test_parse_plain_name() {
        let r = parse_requirement("requests").unwrap();
        assert_eq!(r.name, "requests");
        assert!(r.constraint.is_any());
    }

    #[test]
    fn test_parse_with_specifier() {
        let r = parse_requirement("requests>=2.31.0").unwrap();
        assert_eq!(r.name, "requests");
        assert!(r.constraint.satisfies(&PackageVersion::parse("2.31.0")));
        assert!(!r.constraint.satisfies(&PackageVersion::parse("2.30.0")));
    }

    #[test]
    fn test_parse_with_extras_and_marker() {
        let r = parse_requirement("uvicorn[standard]>=0.22.0; python_version >= '3.8'").unwrap();
        assert_eq!(r.name, "uvicorn");
        assert!(r.constraint.satisfies(&PackageVersion::parse("0.22.0")));
    }

    #[test]
    fn test_parse_compound_specifier_with_spaces() {
        let r = parse_requirement("pydantic >=1.10, <2.0").unwrap();
        assert_eq!(r.name, "pydantic");
        assert!(r.constraint.satisfies(&PackageVersion::parse("1.10.9")));
        assert!(!r.constraint.satisfies(&PackageVersion::parse("2.0")));
    }

    #[test]
    fn test_lines_skip_comments_and_blanks() {
        let lines = ["# deps", "", "requests>=2.31.0", "  ", "numpy"];
        let reqs = parse_requirement_lines(lines).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].name, "requests");
        assert_eq!(reqs[1].name, "numpy");
    }

    #[test]
    fn test_duplicate_keeps_position_takes_last_constraint() {
        let lines = ["pkga==1.0.0", "numpy", "pkgA==2.0.0"];
        let reqs = parse_requirement_lines(lines).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].name, "pkga");
        assert!(reqs[0].constraint.satisfies(&PackageVersion::parse("2.0.0")));
    }

    #[test]
    fn test_invalid_lines() {
        assert!(parse_requirement(">=1.0").is_err());
        assert!(parse_requirement("pkg[extra").is_err());
        assert!(parse_requirement("pkg ==").is_err());
    }

    #[test]
    fn test_load_requirement_lines() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "requests>=2.31.0").unwrap();
        writeln!(file, "numpy==1.24.0").unwrap();

        let lines = load_requirement_lines(file.path()).unwrap();
        let reqs = parse_requirement_lines(lines.iter().map(String::as_str)).unwrap();
        assert_eq!(reqs.len(), 2);
    }
}
