//! Location references.

use super::header::ReferenceHeader;
use super::serde_helpers::blank_as_none;
use crate::error::{RefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Camera angles the generation prompts know how to describe.
pub const KNOWN_ANGLES: &[&str] = &[
    "wide-shot", "medium-shot", "close-up", "aerial", "ground-level", "bird's-eye", "worm's-eye",
    "establishing", "detail",
];

/// Lighting conditions the generation prompts know how to describe.
pub const KNOWN_LIGHTING: &[&str] = &[
    "dawn", "morning", "midday", "afternoon", "dusk", "night", "bright", "dim", "dramatic", "soft",
    "harsh", "natural", "artificial",
];

/// Whether a location is indoors, outdoors, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Interior,
    Exterior,
    Mixed,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Interior => "interior",
            LocationType::Exterior => "exterior",
            LocationType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "interior" => Ok(LocationType::Interior),
            "exterior" => Ok(LocationType::Exterior),
            "mixed" => Ok(LocationType::Mixed),
            other => Err(RefError::Validation(format!(
                "Invalid location type: {other} (expected interior, exterior, or mixed)"
            ))),
        }
    }
}

/// Visual reference for a recurring setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReference {
    #[serde(flatten)]
    pub header: ReferenceHeader,

    #[serde(default, with = "blank_as_none")]
    pub location_type: Option<LocationType>,

    #[serde(default)]
    pub angles: Vec<String>,

    #[serde(default)]
    pub lighting_conditions: Vec<String>,

    #[serde(default)]
    pub time_of_day: Vec<String>,

    #[serde(default)]
    pub weather_conditions: Vec<String>,

    /// `angle_lighting_time` key to image filename.
    #[serde(default)]
    pub images: BTreeMap<String, String>,

    #[serde(default)]
    pub architectural_style: String,

    #[serde(default)]
    pub key_features: Vec<String>,
}

impl LocationReference {
    /// Create an empty location reference.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            header: ReferenceHeader::new(name, description),
            location_type: None,
            angles: Vec::new(),
            lighting_conditions: Vec::new(),
            time_of_day: Vec::new(),
            weather_conditions: Vec::new(),
            images: BTreeMap::new(),
            architectural_style: String::new(),
            key_features: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.header.validate()
    }

    /// Image key for an angle/lighting/time combination.
    ///
    /// `lighting` defaults to `natural` and `time` to `day`.
    pub fn image_key(angle: &str, lighting: Option<&str>, time: Option<&str>) -> String {
        format!(
            "{angle}_{}_{}",
            lighting.unwrap_or("natural"),
            time.unwrap_or("day")
        )
        .to_lowercase()
    }

    pub fn has_image(&self, angle: &str, lighting: Option<&str>, time: Option<&str>) -> bool {
        self.images
            .contains_key(&Self::image_key(angle, lighting, time))
    }

    /// Record an image filename for a combination and bump `updated_at`.
    pub fn add_image(
        &mut self,
        angle: &str,
        lighting: Option<&str>,
        time: Option<&str>,
        filename: impl Into<String>,
    ) {
        self.images
            .insert(Self::image_key(angle, lighting, time), filename.into());
        self.header.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_type_parse() {
        assert_eq!("interior".parse::<LocationType>().unwrap(), LocationType::Interior);
        assert_eq!(" Exterior ".parse::<LocationType>().unwrap(), LocationType::Exterior);
        assert!(matches!(
            "underwater".parse::<LocationType>(),
            Err(RefError::Validation(_))
        ));
    }

    #[test]
    fn test_image_key_defaults() {
        assert_eq!(
            LocationReference::image_key("wide-shot", None, None),
            "wide-shot_natural_day"
        );
        assert_eq!(
            LocationReference::image_key("Aerial", Some("Dusk"), Some("evening")),
            "aerial_dusk_evening"
        );
    }

    #[test]
    fn test_blank_location_type_reads_as_none() {
        let json = serde_json::json!({
            "name": "Forest",
            "description": "A dark and ancient forest",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "location_type": ""
        });
        let forest: LocationReference = serde_json::from_value(json).unwrap();
        assert_eq!(forest.location_type, None);
    }

    #[test]
    fn test_invalid_location_type_fails_to_parse() {
        let json = serde_json::json!({
            "name": "Forest",
            "description": "A dark and ancient forest",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "location_type": "underwater"
        });
        assert!(serde_json::from_value::<LocationReference>(json).is_err());
    }
}
