//! Dependency manifest (`requirements.txt` style) parsing and linting.
//!
//! One specifier per line; blank lines and `#` comments are ignored.
//! [`Manifest::parse`] stops at the first bad line, [`lint`] collects every
//! problem so the whole file can be reported at once.

pub mod specifier;
pub mod version;

pub use specifier::{normalize_name, Constraint, Operator, Requirement};
pub use version::{PreRelease, Version};

use crate::utils::error::{EpiasError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A requirement together with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub line: usize,
    pub requirement: Requirement,
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    InvalidSpecifier { message: String },
    DuplicateName { name: String, first_line: usize },
    Unsatisfiable { requirement: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestIssue {
    pub line: usize,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::InvalidSpecifier { message } => {
                write!(f, "line {}: invalid specifier: {}", self.line, message)
            }
            IssueKind::DuplicateName { name, first_line } => write!(
                f,
                "line {}: duplicate dependency '{}' (first declared on line {})",
                self.line, name, first_line
            ),
            IssueKind::Unsatisfiable { requirement } => write!(
                f,
                "line {}: no version can satisfy '{}'",
                self.line, requirement
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestReport {
    pub entries: Vec<ManifestEntry>,
    pub issues: Vec<ManifestIssue>,
}

impl ManifestReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Strip comments and surrounding whitespace. Returns `None` for lines
/// that carry no specifier.
fn significant_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    // Inline comments need whitespace before the '#'.
    let without_comment = trimmed
        .char_indices()
        .find(|(i, c)| *c == '#' && trimmed[..*i].ends_with(char::is_whitespace))
        .map(|(i, _)| trimmed[..i].trim_end())
        .unwrap_or(trimmed);

    Some(without_comment)
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let Some(spec) = significant_text(raw) else {
                continue;
            };
            let requirement = spec
                .parse::<Requirement>()
                .map_err(|message| EpiasError::ManifestError {
                    line: index + 1,
                    message,
                })?;
            entries.push(ManifestEntry {
                line: index + 1,
                requirement,
            });
        }
        Ok(Self { entries })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = normalize_name(name);
        self.entries
            .iter()
            .map(|e| &e.requirement)
            .find(|r| r.normalized_name() == wanted)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.requirement.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check every line of a manifest and report all problems found.
pub fn lint(text: &str) -> ManifestReport {
    let mut report = ManifestReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let Some(spec) = significant_text(raw) else {
            continue;
        };

        let requirement = match spec.parse::<Requirement>() {
            Ok(requirement) => requirement,
            Err(message) => {
                report.issues.push(ManifestIssue {
                    line,
                    kind: IssueKind::InvalidSpecifier { message },
                });
                continue;
            }
        };

        let normalized = requirement.normalized_name();
        if let Some(first_line) = seen.get(&normalized) {
            report.issues.push(ManifestIssue {
                line,
                kind: IssueKind::DuplicateName {
                    name: requirement.name.clone(),
                    first_line: *first_line,
                },
            });
        } else {
            seen.insert(normalized, line);
        }

        if !requirement.has_feasible_range() {
            report.issues.push(ManifestIssue {
                line,
                kind: IssueKind::Unsatisfiable {
                    requirement: requirement.to_string(),
                },
            });
        }

        report.entries.push(ManifestEntry { line, requirement });
    }

    tracing::debug!(
        "Linted manifest: {} entries, {} issues",
        report.entries.len(),
        report.issues.len()
    );
    report
}

pub fn lint_file<P: AsRef<Path>>(path: P) -> Result<ManifestReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(lint(&content))
}
