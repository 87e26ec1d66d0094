//! Character references.

use super::header::ReferenceHeader;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Poses the generation prompts know how to describe. Others are allowed.
pub const KNOWN_POSES: &[&str] = &[
    "standing", "sitting", "running", "walking", "fighting", "pointing", "climbing", "jumping",
    "lying", "kneeling", "crouching", "flying",
];

/// Expressions the generation prompts know how to describe. Others are allowed.
pub const KNOWN_EXPRESSIONS: &[&str] = &[
    "neutral", "happy", "sad", "angry", "surprised", "worried", "determined", "confused",
    "excited", "focused", "scared", "confident",
];

/// Visual reference for a recurring character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterReference {
    #[serde(flatten)]
    pub header: ReferenceHeader,

    #[serde(default)]
    pub poses: Vec<String>,

    #[serde(default)]
    pub expressions: Vec<String>,

    #[serde(default)]
    pub outfits: Vec<String>,

    /// `pose_expression_outfit` key to image filename.
    #[serde(default)]
    pub images: BTreeMap<String, String>,

    #[serde(default)]
    pub age_range: String,

    #[serde(default)]
    pub physical_traits: Vec<String>,

    #[serde(default)]
    pub personality_traits: Vec<String>,
}

impl CharacterReference {
    /// Create an empty character reference.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            header: ReferenceHeader::new(name, description),
            poses: Vec::new(),
            expressions: Vec::new(),
            outfits: Vec::new(),
            images: BTreeMap::new(),
            age_range: String::new(),
            physical_traits: Vec::new(),
            personality_traits: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.header.validate()
    }

    /// Image key for a pose/expression/outfit combination.
    ///
    /// `expression` defaults to `neutral` and `outfit` to `default`.
    pub fn image_key(pose: &str, expression: Option<&str>, outfit: Option<&str>) -> String {
        format!(
            "{pose}_{}_{}",
            expression.unwrap_or("neutral"),
            outfit.unwrap_or("default")
        )
        .to_lowercase()
    }

    pub fn has_image(&self, pose: &str, expression: Option<&str>, outfit: Option<&str>) -> bool {
        self.images
            .contains_key(&Self::image_key(pose, expression, outfit))
    }

    /// Record an image filename for a combination and bump `updated_at`.
    pub fn add_image(
        &mut self,
        pose: &str,
        expression: Option<&str>,
        outfit: Option<&str>,
        filename: impl Into<String>,
    ) {
        self.images
            .insert(Self::image_key(pose, expression, outfit), filename.into());
        self.header.touch();
    }
}
