//! Typed reference records.
//!
//! A [`Reference`] is a closed sum over the four kinds of thing a comic keeps
//! consistent between panels. Each variant embeds the shared
//! [`ReferenceHeader`] and adds its own fields. On disk the variants are told
//! apart by a `type` discriminator:
//!
//! ```text
//! {
//!   "type": "character",
//!   "name": "Hero",
//!   "description": "...",
//!   "created_at": "2024-05-01T12:00:00Z",
//!   ...variant fields...
//! }
//! ```

mod character;
mod header;
mod location;
mod object;
mod serde_helpers;
mod style;
mod update;

pub use character::{CharacterReference, KNOWN_EXPRESSIONS, KNOWN_POSES};
pub use header::{ReferenceHeader, RESERVED_NAME_CHARS};
pub use location::{LocationReference, LocationType, KNOWN_ANGLES, KNOWN_LIGHTING};
pub use object::{ObjectReference, SizeCategory, KNOWN_STATES, KNOWN_VIEWS};
pub use style::{is_hex_color, StyleGuide, KNOWN_ART_STYLES};
pub use update::{CharacterUpdate, LocationUpdate, ObjectUpdate, ReferenceUpdate, StyleGuideUpdate};

use crate::error::{RefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kind of a reference. Doubles as the `type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Character,
    Location,
    Object,
    #[serde(rename = "styleguide")]
    StyleGuide,
}

impl ReferenceType {
    /// Every reference type, in listing order.
    pub const ALL: [ReferenceType; 4] = [
        ReferenceType::Character,
        ReferenceType::Location,
        ReferenceType::Object,
        ReferenceType::StyleGuide,
    ];

    /// The discriminator string written to metadata files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Character => "character",
            ReferenceType::Location => "location",
            ReferenceType::Object => "object",
            ReferenceType::StyleGuide => "styleguide",
        }
    }

    /// Directory under the store root holding this type's files.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ReferenceType::Character => "characters",
            ReferenceType::Location => "locations",
            ReferenceType::Object => "objects",
            ReferenceType::StyleGuide => "styles",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" => Ok(ReferenceType::Character),
            "location" => Ok(ReferenceType::Location),
            "object" => Ok(ReferenceType::Object),
            "styleguide" => Ok(ReferenceType::StyleGuide),
            other => Err(RefError::Validation(format!(
                "Unknown reference type: {other}"
            ))),
        }
    }
}

/// A stored reference of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reference {
    Character(CharacterReference),
    Location(LocationReference),
    Object(ObjectReference),
    #[serde(rename = "styleguide")]
    StyleGuide(StyleGuide),
}

impl Reference {
    /// Create an empty reference of the given type.
    pub fn new(
        ref_type: ReferenceType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        match ref_type {
            ReferenceType::Character => {
                Reference::Character(CharacterReference::new(name, description))
            }
            ReferenceType::Location => {
                Reference::Location(LocationReference::new(name, description))
            }
            ReferenceType::Object => Reference::Object(ObjectReference::new(name, description)),
            ReferenceType::StyleGuide => {
                Reference::StyleGuide(StyleGuide::new(name, description))
            }
        }
    }

    pub fn ref_type(&self) -> ReferenceType {
        match self {
            Reference::Character(_) => ReferenceType::Character,
            Reference::Location(_) => ReferenceType::Location,
            Reference::Object(_) => ReferenceType::Object,
            Reference::StyleGuide(_) => ReferenceType::StyleGuide,
        }
    }

    pub fn header(&self) -> &ReferenceHeader {
        match self {
            Reference::Character(r) => &r.header,
            Reference::Location(r) => &r.header,
            Reference::Object(r) => &r.header,
            Reference::StyleGuide(r) => &r.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut ReferenceHeader {
        match self {
            Reference::Character(r) => &mut r.header,
            Reference::Location(r) => &mut r.header,
            Reference::Object(r) => &mut r.header,
            Reference::StyleGuide(r) => &mut r.header,
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name
    }

    /// Run the variant's field validation.
    pub fn validate(&self) -> Result<()> {
        match self {
            Reference::Character(r) => r.validate(),
            Reference::Location(r) => r.validate(),
            Reference::Object(r) => r.validate(),
            Reference::StyleGuide(r) => r.validate(),
        }
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.header_mut().touch();
    }

    /// The image-key to filename map. Style guides have none.
    pub fn images(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Reference::Character(r) => Some(&r.images),
            Reference::Location(r) => Some(&r.images),
            Reference::Object(r) => Some(&r.images),
            Reference::StyleGuide(_) => None,
        }
    }

    pub fn images_mut(&mut self) -> Option<&mut BTreeMap<String, String>> {
        match self {
            Reference::Character(r) => Some(&mut r.images),
            Reference::Location(r) => Some(&mut r.images),
            Reference::Object(r) => Some(&mut r.images),
            Reference::StyleGuide(_) => None,
        }
    }

    /// Convert to the structured record written to disk.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| RefError::Validation(format!("Failed to encode reference: {e}")))
    }

    /// Rebuild a reference from a record, dispatching on its `type` field.
    ///
    /// A missing or unrecognized discriminator is an error, never a default.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let type_field = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| RefError::Validation("Reference record has no type field".into()))?;
        let ref_type: ReferenceType = type_field.parse()?;

        let reference: Reference = serde_json::from_value(value).map_err(|e| {
            RefError::Validation(format!("Malformed {ref_type} record: {e}"))
        })?;
        reference.validate()?;
        Ok(reference)
    }
}
