//! Field-level grading of a single reference.

use super::{has_severity_at_least, Severity, ValidationIssue};
use crate::model::{
    is_hex_color, CharacterReference, LocationReference, ObjectReference, Reference, StyleGuide,
    KNOWN_ANGLES, KNOWN_ART_STYLES, KNOWN_EXPRESSIONS, KNOWN_LIGHTING, KNOWN_POSES, KNOWN_STATES,
    KNOWN_VIEWS,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

lazy_static! {
    /// Names start with a letter and contain letters, digits, `_`, `-` and spaces.
    pub static ref NAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_ -]*$").expect("valid name regex");
}

/// Names that collide with placeholder values in prompts and configs.
pub const RESERVED_NAMES: &[&str] = &["default", "none", "null", "undefined", "test"];

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;
const MIN_DESCRIPTION_LENGTH: usize = 10;
const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Grades references against naming and completeness conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceValidator;

impl ReferenceValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `reference` and collect every issue found.
    ///
    /// A reference that fails its hard invariants is always invalid. In
    /// `strict` mode a critical issue also makes it invalid; otherwise issues
    /// are advisory.
    pub fn validate_reference(
        &self,
        reference: &Reference,
        strict: bool,
    ) -> (bool, Vec<ValidationIssue>) {
        let mut issues = Vec::new();

        if let Err(e) = reference.validate() {
            warn!(name = reference.name(), error = %e, "Reference failed validation");
            issues.push(ValidationIssue::critical("general", e.to_string()));
            return (false, issues);
        }

        let header = reference.header();
        issues.extend(self.validate_name(&header.name));
        issues.extend(self.validate_description(&header.description));

        match reference {
            Reference::Character(c) => issues.extend(self.validate_character(c)),
            Reference::Location(l) => issues.extend(self.validate_location(l)),
            Reference::Object(o) => issues.extend(self.validate_object(o)),
            Reference::StyleGuide(s) => issues.extend(self.validate_style_guide(s)),
        }

        let valid = !(strict && has_severity_at_least(&issues, Severity::Critical));
        (valid, issues)
    }

    pub fn validate_name(&self, name: &str) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let len = name.chars().count();

        if len < MIN_NAME_LENGTH {
            issues.push(ValidationIssue::major(
                "name",
                format!("Name too short (min {MIN_NAME_LENGTH} chars)"),
            ));
        } else if len > MAX_NAME_LENGTH {
            issues.push(ValidationIssue::minor(
                "name",
                format!("Name too long (max {MAX_NAME_LENGTH} chars)"),
            ));
        }

        if !NAME_PATTERN.is_match(name) {
            issues.push(ValidationIssue::major(
                "name",
                "Name contains invalid characters",
            ));
        }

        if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
            issues.push(ValidationIssue::critical(
                "name",
                format!("'{name}' is a reserved name"),
            ));
        }

        issues
    }

    pub fn validate_description(&self, description: &str) -> Vec<ValidationIssue> {
        let len = description.chars().count();
        if len < MIN_DESCRIPTION_LENGTH {
            vec![ValidationIssue::minor(
                "description",
                format!("Description too short (min {MIN_DESCRIPTION_LENGTH} chars)"),
            )]
        } else if len > MAX_DESCRIPTION_LENGTH {
            vec![ValidationIssue::minor(
                "description",
                format!("Description too long (max {MAX_DESCRIPTION_LENGTH} chars)"),
            )]
        } else {
            Vec::new()
        }
    }

    fn validate_character(&self, character: &CharacterReference) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if character.poses.is_empty() {
            issues.push(ValidationIssue::warning("poses", "No poses defined for character"));
        }
        if character.expressions.is_empty() {
            issues.push(ValidationIssue::warning(
                "expressions",
                "No expressions defined for character",
            ));
        }
        if has_duplicates(&character.poses) {
            issues.push(ValidationIssue::minor("poses", "Duplicate poses detected"));
        }
        if has_duplicates(&character.expressions) {
            issues.push(ValidationIssue::minor(
                "expressions",
                "Duplicate expressions detected",
            ));
        }

        issues.extend(uncommon("poses", &character.poses, KNOWN_POSES));
        issues.extend(uncommon("expressions", &character.expressions, KNOWN_EXPRESSIONS));
        issues
    }

    fn validate_location(&self, location: &LocationReference) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if location.angles.is_empty() {
            issues.push(ValidationIssue::warning(
                "angles",
                "No camera angles defined for location",
            ));
        }
        if location.lighting_conditions.is_empty() {
            issues.push(ValidationIssue::warning(
                "lighting_conditions",
                "No lighting conditions defined",
            ));
        }

        issues.extend(uncommon("angles", &location.angles, KNOWN_ANGLES));
        issues.extend(uncommon(
            "lighting_conditions",
            &location.lighting_conditions,
            KNOWN_LIGHTING,
        ));
        issues
    }

    fn validate_object(&self, object: &ObjectReference) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if object.views.is_empty() {
            issues.push(ValidationIssue::warning("views", "No views defined for object"));
        }
        if object.states.is_empty() {
            issues.push(ValidationIssue::warning("states", "No states defined for object"));
        }

        issues.extend(uncommon("views", &object.views, KNOWN_VIEWS));
        issues.extend(uncommon("states", &object.states, KNOWN_STATES));
        issues
    }

    fn validate_style_guide(&self, style: &StyleGuide) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = style
            .color_palette
            .iter()
            .filter(|c| !is_hex_color(c))
            .map(|c| ValidationIssue::minor("color_palette", format!("Invalid color format: {c}")))
            .collect();

        if !style.art_style.is_empty()
            && !KNOWN_ART_STYLES.contains(&style.art_style.to_lowercase().as_str())
        {
            issues.push(ValidationIssue::warning(
                "art_style",
                format!("Uncommon art style '{}'", style.art_style),
            ));
        }
        issues
    }
}

fn has_duplicates(values: &[String]) -> bool {
    let mut seen = HashSet::new();
    values.iter().any(|v| !seen.insert(v))
}

/// Warn about vocabulary the prompt builder has no phrasing for.
fn uncommon(field: &str, values: &[String], known: &[&str]) -> Vec<ValidationIssue> {
    values
        .iter()
        .filter(|v| !known.contains(&v.to_lowercase().as_str()))
        .map(|v| ValidationIssue::warning(field, format!("Uncommon value '{v}'")))
        .collect()
}
