//! Aggregated validation results for a batch of references and images.

use super::{Severity, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result of validating one reference or image.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Utc>,
    /// Keyed by `type/name`.
    pub reference_results: BTreeMap<String, CheckResult>,
    /// Keyed by `type/name/filename`.
    pub image_results: BTreeMap<String, CheckResult>,
    pub consistency_issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultCounts {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub generated_at: DateTime<Utc>,
    pub is_valid: bool,
    pub references: ResultCounts,
    pub images: ResultCounts,
    pub issues: IssueCounts,
}

fn counts(results: &BTreeMap<String, CheckResult>) -> ResultCounts {
    let total = results.len();
    let valid = results.values().filter(|r| r.valid).count();
    ResultCounts {
        total,
        valid,
        invalid: total - valid,
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn add_reference_result(
        &mut self,
        id: impl Into<String>,
        valid: bool,
        issues: Vec<ValidationIssue>,
    ) {
        self.reference_results
            .insert(id.into(), CheckResult { valid, issues });
    }

    pub fn add_image_result(&mut self, id: impl Into<String>, valid: bool, issues: Vec<ValidationIssue>) {
        self.image_results
            .insert(id.into(), CheckResult { valid, issues });
    }

    pub fn set_consistency_issues(&mut self, issues: Vec<ValidationIssue>) {
        self.consistency_issues = issues;
    }

    /// Every reference and image passed and no consistency issue is critical.
    pub fn is_valid(&self) -> bool {
        self.reference_results.values().all(|r| r.valid)
            && self.image_results.values().all(|r| r.valid)
            && !self
                .consistency_issues
                .iter()
                .any(|i| i.severity == Severity::Critical)
    }

    fn all_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.reference_results
            .values()
            .chain(self.image_results.values())
            .flat_map(|r| r.issues.iter())
            .chain(self.consistency_issues.iter())
    }

    pub fn summary(&self) -> ValidationSummary {
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut total = 0;
        for issue in self.all_issues() {
            *by_severity.entry(issue.severity).or_default() += 1;
            total += 1;
        }

        ValidationSummary {
            generated_at: self.generated_at,
            is_valid: self.is_valid(),
            references: counts(&self.reference_results),
            images: counts(&self.image_results),
            issues: IssueCounts { total, by_severity },
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        let rule = "=".repeat(60);
        let thin = "-".repeat(40);

        writeln!(f, "{rule}")?;
        writeln!(f, "VALIDATION REPORT")?;
        writeln!(f, "Generated: {}", self.generated_at.to_rfc3339())?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "\nOverall Status: {}",
            if summary.is_valid { "VALID" } else { "INVALID" }
        )?;
        writeln!(
            f,
            "\nReferences: {}/{} valid",
            summary.references.valid, summary.references.total
        )?;
        writeln!(
            f,
            "Images: {}/{} valid",
            summary.images.valid, summary.images.total
        )?;
        writeln!(f, "\nIssues: {}", summary.issues.total)?;
        for severity in Severity::ALL {
            let count = summary.issues.by_severity.get(&severity).copied().unwrap_or(0);
            if count > 0 {
                writeln!(f, "  - {}: {count}", severity.as_str().to_uppercase())?;
            }
        }

        for (title, results) in [
            ("REFERENCE VALIDATION:", &self.reference_results),
            ("IMAGE VALIDATION:", &self.image_results),
        ] {
            if results.is_empty() {
                continue;
            }
            writeln!(f, "\n{thin}")?;
            writeln!(f, "{title}")?;
            for (id, result) in results {
                let status = if result.valid { "[ok]" } else { "[failed]" };
                writeln!(f, "\n{status} {id}")?;
                for issue in &result.issues {
                    writeln!(f, "  {issue}")?;
                }
            }
        }

        if !self.consistency_issues.is_empty() {
            writeln!(f, "\n{thin}")?;
            writeln!(f, "CONSISTENCY ISSUES:")?;
            for issue in &self.consistency_issues {
                writeln!(f, "  {issue}")?;
            }
        }

        write!(f, "\n{rule}")
    }
}
