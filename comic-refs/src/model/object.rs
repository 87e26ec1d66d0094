//! Object (prop) references.

use super::header::ReferenceHeader;
use super::serde_helpers::blank_as_none;
use crate::error::{RefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const KNOWN_VIEWS: &[&str] = &[
    "front", "back", "left", "right", "top", "bottom", "three-quarter", "profile", "detail",
    "action", "closed", "open",
];

pub const KNOWN_STATES: &[&str] = &[
    "new", "worn", "aged", "broken", "damaged", "repaired", "magical", "glowing", "active",
    "inactive", "pristine",
];

/// Rough physical size of an object relative to a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::Tiny => "tiny",
            SizeCategory::Small => "small",
            SizeCategory::Medium => "medium",
            SizeCategory::Large => "large",
            SizeCategory::Huge => "huge",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeCategory {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(SizeCategory::Tiny),
            "small" => Ok(SizeCategory::Small),
            "medium" => Ok(SizeCategory::Medium),
            "large" => Ok(SizeCategory::Large),
            "huge" => Ok(SizeCategory::Huge),
            other => Err(RefError::Validation(format!(
                "Invalid size category: {other} (expected tiny, small, medium, large, or huge)"
            ))),
        }
    }
}

/// Visual reference for a recurring prop: a weapon, vehicle, artifact, etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReference {
    #[serde(flatten)]
    pub header: ReferenceHeader,

    #[serde(default)]
    pub object_type: String,

    #[serde(default)]
    pub views: Vec<String>,

    #[serde(default)]
    pub states: Vec<String>,

    #[serde(default, with = "blank_as_none")]
    pub size_category: Option<SizeCategory>,

    /// `view_state` key to image filename.
    #[serde(default)]
    pub images: BTreeMap<String, String>,

    #[serde(default)]
    pub materials: Vec<String>,

    #[serde(default)]
    pub colors: Vec<String>,

    #[serde(default)]
    pub special_properties: Vec<String>,
}

impl ObjectReference {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            header: ReferenceHeader::new(name, description),
            object_type: String::new(),
            views: Vec::new(),
            states: Vec::new(),
            size_category: None,
            images: BTreeMap::new(),
            materials: Vec::new(),
            colors: Vec::new(),
            special_properties: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.header.validate()
    }

    /// Image key for a view/state combination. `state` defaults to `new`.
    pub fn image_key(view: &str, state: Option<&str>) -> String {
        format!("{view}_{}", state.unwrap_or("new")).to_lowercase()
    }

    pub fn has_image(&self, view: &str, state: Option<&str>) -> bool {
        self.images.contains_key(&Self::image_key(view, state))
    }

    pub fn add_image(&mut self, view: &str, state: Option<&str>, filename: impl Into<String>) {
        self.images
            .insert(Self::image_key(view, state), filename.into());
        self.header.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_category_parse() {
        assert_eq!("HUGE".parse::<SizeCategory>().unwrap(), SizeCategory::Huge);
        assert!("gigantic".parse::<SizeCategory>().is_err());
    }

    #[test]
    fn test_image_key() {
        assert_eq!(ObjectReference::image_key("front", None), "front_new");
        assert_eq!(ObjectReference::image_key("Profile", Some("Glowing")), "profile_glowing");

        let mut sword = ObjectReference::new("Sword", "A legendary blade");
        sword.add_image("front", Some("magical"), "front_magical.png");
        assert!(sword.has_image("front", Some("magical")));
        assert!(!sword.has_image("front", None));
    }
}
