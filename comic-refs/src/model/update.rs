//! Field updates for existing references.
//!
//! Each reference type has its own update struct listing exactly the fields
//! that may change after creation. `name`, `created_at`, `updated_at` and the
//! type itself are never updatable. Deserialization rejects unknown fields, so
//! a misspelled field name is an error instead of a silent no-op.

use super::{LocationType, Reference, ReferenceType, SizeCategory};
use crate::error::{RefError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Assign `value` into `slot` when present.
fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterUpdate {
    pub description: Option<String>,
    pub style_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub poses: Option<Vec<String>>,
    pub expressions: Option<Vec<String>>,
    pub outfits: Option<Vec<String>>,
    pub images: Option<BTreeMap<String, String>>,
    pub age_range: Option<String>,
    pub physical_traits: Option<Vec<String>>,
    pub personality_traits: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationUpdate {
    pub description: Option<String>,
    pub style_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location_type: Option<LocationType>,
    pub angles: Option<Vec<String>>,
    pub lighting_conditions: Option<Vec<String>>,
    pub time_of_day: Option<Vec<String>>,
    pub weather_conditions: Option<Vec<String>>,
    pub images: Option<BTreeMap<String, String>>,
    pub architectural_style: Option<String>,
    pub key_features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectUpdate {
    pub description: Option<String>,
    pub style_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub object_type: Option<String>,
    pub views: Option<Vec<String>>,
    pub states: Option<Vec<String>>,
    pub size_category: Option<SizeCategory>,
    pub images: Option<BTreeMap<String, String>>,
    pub materials: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub special_properties: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleGuideUpdate {
    pub description: Option<String>,
    pub style_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub art_style: Option<String>,
    pub color_palette: Option<Vec<String>>,
    pub color_mood: Option<String>,
    pub line_style: Option<String>,
    pub lighting_style: Option<String>,
    pub typography: Option<String>,
    pub reference_image: Option<String>,
    pub texture_style: Option<String>,
    pub composition_style: Option<String>,
}

/// An update for one reference type.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceUpdate {
    Character(CharacterUpdate),
    Location(LocationUpdate),
    Object(ObjectUpdate),
    StyleGuide(StyleGuideUpdate),
}

impl ReferenceUpdate {
    /// An update that changes nothing.
    pub fn empty(ref_type: ReferenceType) -> Self {
        match ref_type {
            ReferenceType::Character => ReferenceUpdate::Character(CharacterUpdate::default()),
            ReferenceType::Location => ReferenceUpdate::Location(LocationUpdate::default()),
            ReferenceType::Object => ReferenceUpdate::Object(ObjectUpdate::default()),
            ReferenceType::StyleGuide => {
                ReferenceUpdate::StyleGuide(StyleGuideUpdate::default())
            }
        }
    }

    /// Parse an update from a JSON object of field name to new value.
    ///
    /// Unknown fields and values of the wrong shape are rejected.
    pub fn from_fields(ref_type: ReferenceType, fields: serde_json::Value) -> Result<Self> {
        fn parse<T: DeserializeOwned>(
            ref_type: ReferenceType,
            fields: serde_json::Value,
        ) -> Result<T> {
            serde_json::from_value(fields).map_err(|e| {
                RefError::Validation(format!("Invalid {ref_type} update: {e}"))
            })
        }

        Ok(match ref_type {
            ReferenceType::Character => ReferenceUpdate::Character(parse(ref_type, fields)?),
            ReferenceType::Location => ReferenceUpdate::Location(parse(ref_type, fields)?),
            ReferenceType::Object => ReferenceUpdate::Object(parse(ref_type, fields)?),
            ReferenceType::StyleGuide => ReferenceUpdate::StyleGuide(parse(ref_type, fields)?),
        })
    }

    pub fn ref_type(&self) -> ReferenceType {
        match self {
            ReferenceUpdate::Character(_) => ReferenceType::Character,
            ReferenceUpdate::Location(_) => ReferenceType::Location,
            ReferenceUpdate::Object(_) => ReferenceType::Object,
            ReferenceUpdate::StyleGuide(_) => ReferenceType::StyleGuide,
        }
    }

    /// Merge the supplied fields into `reference`.
    ///
    /// Does not touch timestamps or re-validate; the caller decides both.
    pub fn apply_to(self, reference: &mut Reference) -> Result<()> {
        match (self, reference) {
            (ReferenceUpdate::Character(u), Reference::Character(r)) => {
                set(&mut r.header.description, u.description);
                set(&mut r.header.style_notes, u.style_notes);
                set(&mut r.header.tags, u.tags);
                set(&mut r.poses, u.poses);
                set(&mut r.expressions, u.expressions);
                set(&mut r.outfits, u.outfits);
                set(&mut r.images, u.images);
                set(&mut r.age_range, u.age_range);
                set(&mut r.physical_traits, u.physical_traits);
                set(&mut r.personality_traits, u.personality_traits);
            }
            (ReferenceUpdate::Location(u), Reference::Location(r)) => {
                set(&mut r.header.description, u.description);
                set(&mut r.header.style_notes, u.style_notes);
                set(&mut r.header.tags, u.tags);
                set(&mut r.location_type, u.location_type.map(Some));
                set(&mut r.angles, u.angles);
                set(&mut r.lighting_conditions, u.lighting_conditions);
                set(&mut r.time_of_day, u.time_of_day);
                set(&mut r.weather_conditions, u.weather_conditions);
                set(&mut r.images, u.images);
                set(&mut r.architectural_style, u.architectural_style);
                set(&mut r.key_features, u.key_features);
            }
            (ReferenceUpdate::Object(u), Reference::Object(r)) => {
                set(&mut r.header.description, u.description);
                set(&mut r.header.style_notes, u.style_notes);
                set(&mut r.header.tags, u.tags);
                set(&mut r.object_type, u.object_type);
                set(&mut r.views, u.views);
                set(&mut r.states, u.states);
                set(&mut r.size_category, u.size_category.map(Some));
                set(&mut r.images, u.images);
                set(&mut r.materials, u.materials);
                set(&mut r.colors, u.colors);
                set(&mut r.special_properties, u.special_properties);
            }
            (ReferenceUpdate::StyleGuide(u), Reference::StyleGuide(r)) => {
                set(&mut r.header.description, u.description);
                set(&mut r.header.style_notes, u.style_notes);
                set(&mut r.header.tags, u.tags);
                set(&mut r.art_style, u.art_style);
                set(&mut r.color_palette, u.color_palette);
                set(&mut r.color_mood, u.color_mood);
                set(&mut r.line_style, u.line_style);
                set(&mut r.lighting_style, u.lighting_style);
                set(&mut r.typography, u.typography);
                set(&mut r.reference_image, u.reference_image);
                set(&mut r.texture_style, u.texture_style);
                set(&mut r.composition_style, u.composition_style);
            }
            (update, reference) => {
                return Err(RefError::Validation(format!(
                    "Cannot apply a {} update to {} reference '{}'",
                    update.ref_type(),
                    reference.ref_type(),
                    reference.name()
                )));
            }
        }
        Ok(())
    }
}
