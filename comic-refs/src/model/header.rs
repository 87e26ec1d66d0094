//! The header shared by every reference variant.

use crate::error::{RefError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters that may not appear in a reference name because they are
/// reserved on at least one common filesystem.
pub const RESERVED_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fields common to characters, locations, objects, and style guides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceHeader {
    /// Unique key within the reference type.
    pub name: String,

    /// Prose description used when prompting for new artwork.
    pub description: String,

    /// Free-form notes about how this reference should be drawn.
    #[serde(default)]
    pub style_notes: String,

    /// When the reference was first created.
    pub created_at: DateTime<Utc>,

    /// When any field last changed.
    pub updated_at: DateTime<Utc>,

    /// Unordered labels used for filtering.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ReferenceHeader {
    /// Create a header with both timestamps set to now.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            style_notes: String::new(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    /// Check the constraints every variant shares.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RefError::Validation(
                "Reference name cannot be empty".to_string(),
            ));
        }

        if self.description.trim().is_empty() {
            return Err(RefError::Validation(
                "Reference description cannot be empty".to_string(),
            ));
        }

        if let Some(c) = self.name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
            return Err(RefError::Validation(format!(
                "Reference name '{}' contains reserved character '{c}'",
                self.name
            )));
        }

        Ok(())
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True if any of `tags` is present on this reference.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}
