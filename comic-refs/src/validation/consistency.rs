//! Cross-reference checks: collisions and conflicting styles.

use super::ValidationIssue;
use crate::model::{Reference, ReferenceType};
use std::collections::{BTreeSet, HashSet};

/// Names scoring above this are reported as confusable.
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Rough similarity of two names in `0.0..=1.0`, case-insensitive.
///
/// Equal names score 1, a name contained in the other scores 0.85, and
/// otherwise the score is the shared prefix length over the longer length.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.85;
    }

    let common_prefix = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count();
    let max_len = a.chars().count().max(b.chars().count());

    if common_prefix == 0 || max_len == 0 {
        0.0
    } else {
        common_prefix as f64 / max_len as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyValidator;

impl ConsistencyValidator {
    pub fn new() -> Self {
        Self
    }

    /// Look for problems that only show up across a set of references.
    pub fn check_consistency(&self, references: &[Reference]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let mut seen: HashSet<(ReferenceType, String)> = HashSet::new();
        for reference in references {
            let key = (reference.ref_type(), reference.name().to_lowercase());
            if !seen.insert(key) {
                issues.push(ValidationIssue::major(
                    "naming",
                    format!(
                        "Duplicate name '{}' in {}",
                        reference.name(),
                        reference.ref_type()
                    ),
                ));
            }
        }

        for (i, first) in references.iter().enumerate() {
            for second in &references[i + 1..] {
                let (a, b) = (first.name(), second.name());
                if a.to_lowercase() != b.to_lowercase()
                    && name_similarity(a, b) > SIMILARITY_THRESHOLD
                {
                    issues.push(ValidationIssue::minor(
                        "naming",
                        format!("Similar names might be confusing: '{a}' and '{b}'"),
                    ));
                }
            }
        }

        let art_styles: BTreeSet<&str> = references
            .iter()
            .filter_map(|r| match r {
                Reference::StyleGuide(s) if !s.art_style.is_empty() => Some(s.art_style.as_str()),
                _ => None,
            })
            .collect();
        if art_styles.len() > 1 {
            let listed: Vec<&str> = art_styles.into_iter().collect();
            issues.push(ValidationIssue::warning(
                "style",
                format!("Multiple art styles defined: {}", listed.join(", ")),
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StyleGuide;
    use crate::validation::Severity;

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("Hero", "hero"), 1.0);
        assert_eq!(name_similarity("Hero", "Superhero"), 0.85);
        assert_eq!(name_similarity("Hero", "Villain"), 0.0);
        assert!((name_similarity("Captain", "Capture") - 4.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_names_within_type() {
        let refs = vec![
            Reference::new(ReferenceType::Character, "Hero", "First hero"),
            Reference::new(ReferenceType::Character, "HERO", "Second hero"),
            Reference::new(ReferenceType::Location, "Hero", "A town named Hero"),
        ];
        let issues = ConsistencyValidator::new().check_consistency(&refs);

        let duplicates: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == Severity::Major)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].message.contains("HERO"));
    }

    #[test]
    fn test_similar_names() {
        let refs = vec![
            Reference::new(ReferenceType::Character, "Knight", "A knight"),
            Reference::new(ReferenceType::Character, "Dark Knight", "Another knight"),
            Reference::new(ReferenceType::Location, "Castle", "A castle"),
        ];
        let issues = ConsistencyValidator::new().check_consistency(&refs);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Minor);
    }

    #[test]
    fn test_conflicting_art_styles() {
        let mut noir = StyleGuide::new("Noir", "Ink and shadow");
        noir.art_style = "noir".into();
        let mut bright = StyleGuide::new("Sunny", "Bright colors");
        bright.art_style = "cartoon".into();
        let blank = StyleGuide::new("Plain", "Nothing set");

        let issues = ConsistencyValidator::new().check_consistency(&[
            Reference::StyleGuide(noir),
            Reference::StyleGuide(bright),
            Reference::StyleGuide(blank),
        ]);
        let styles: Vec<_> = issues.iter().filter(|i| i.field == "style").collect();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].severity, Severity::Warning);
        assert!(styles[0].message.contains("cartoon, noir"));
    }
}
