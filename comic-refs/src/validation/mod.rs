//! Quality checks layered on top of the model's hard invariants.
//!
//! [`Reference::validate`](crate::model::Reference::validate) rejects records
//! that must never be stored. The validators here grade everything else:
//! naming conventions, missing detail, image dimensions, and collisions
//! between references. They report [`ValidationIssue`]s ranked by
//! [`Severity`] instead of failing outright.

mod consistency;
mod image;
mod reference;
mod report;

pub use consistency::{name_similarity, ConsistencyValidator};
pub use image::{ImageCheck, ImageValidator, QualityCheck};
pub use reference::{ReferenceValidator, NAME_PATTERN, RESERVED_NAMES};
pub use report::{CheckResult, IssueCounts, ResultCounts, ValidationReport, ValidationSummary};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious an issue is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Warning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding against one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, Severity::Warning)
    }

    pub fn minor(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, Severity::Minor)
    }

    pub fn major(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, Severity::Major)
    }

    pub fn critical(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, Severity::Critical)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.severity.as_str().to_uppercase(),
            self.field,
            self.message
        )
    }
}

/// True if any issue is at least `severity`.
pub fn has_severity_at_least(issues: &[ValidationIssue], severity: Severity) -> bool {
    issues.iter().any(|i| i.severity >= severity)
}
