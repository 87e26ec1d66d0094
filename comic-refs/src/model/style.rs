//! Style guides: the visual rules shared by every panel of a book.

use super::header::ReferenceHeader;
use crate::error::{RefError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex");
}

/// Art styles the generation prompts know how to describe.
pub const KNOWN_ART_STYLES: &[&str] = &[
    "realistic", "cartoon", "anime", "manga", "comic-book", "noir", "watercolor", "oil-painting",
    "sketch", "digital-art",
];

/// Check that `color` is a `#RRGGBB` hex code.
pub fn is_hex_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    #[serde(flatten)]
    pub header: ReferenceHeader,

    #[serde(default)]
    pub art_style: String,

    /// `#RRGGBB` hex codes.
    #[serde(default)]
    pub color_palette: Vec<String>,

    #[serde(default)]
    pub color_mood: String,

    #[serde(default)]
    pub line_style: String,

    #[serde(default)]
    pub lighting_style: String,

    #[serde(default)]
    pub typography: String,

    /// Filename of the style reference image, if any.
    #[serde(default)]
    pub reference_image: String,

    #[serde(default)]
    pub texture_style: String,

    #[serde(default)]
    pub composition_style: String,
}

impl StyleGuide {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            header: ReferenceHeader::new(name, description),
            art_style: String::new(),
            color_palette: Vec::new(),
            color_mood: String::new(),
            line_style: String::new(),
            lighting_style: String::new(),
            typography: String::new(),
            reference_image: String::new(),
            texture_style: String::new(),
            composition_style: String::new(),
        }
    }

    /// Header checks plus every palette entry must be a hex color.
    pub fn validate(&self) -> Result<()> {
        self.header.validate()?;

        if let Some(bad) = self.color_palette.iter().find(|c| !is_hex_color(c)) {
            return Err(RefError::Validation(format!("Invalid color code: {bad}")));
        }

        Ok(())
    }

    /// Add a color to the palette, prefixing `#` if it is missing.
    ///
    /// Colors already present are ignored.
    pub fn add_color(&mut self, color: &str) -> Result<()> {
        let color = if color.starts_with('#') {
            color.to_string()
        } else {
            format!("#{color}")
        };

        if !is_hex_color(&color) {
            return Err(RefError::Validation(format!("Invalid color code: {color}")));
        }

        if !self.color_palette.contains(&color) {
            self.color_palette.push(color);
            self.header.touch();
        }
        Ok(())
    }

    pub fn remove_color(&mut self, color: &str) {
        if let Some(pos) = self.color_palette.iter().position(|c| c == color) {
            self.color_palette.remove(pos);
            self.header.touch();
        }
    }
}
