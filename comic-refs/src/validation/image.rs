//! Byte-level checks for reference images.

use super::{has_severity_at_least, Severity, ValidationIssue};
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::warn;

/// Largest accepted image, in bytes.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 4096;

const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Outcome of [`ImageValidator::validate_image`].
#[derive(Debug, Clone)]
pub struct ImageCheck {
    /// False when the image is too big, undecodable, in an unsupported
    /// format, or outside the dimension bounds.
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub format: Option<ImageFormat>,
    pub dimensions: Option<(u32, u32)>,
}

/// Outcome of [`ImageValidator::check_quality`].
#[derive(Debug, Clone)]
pub struct QualityCheck {
    /// Heuristic score in `0.0..=1.0`.
    pub score: f64,
    pub issues: Vec<ValidationIssue>,
}

/// What the header of an image tells us without a full decode.
struct Probe {
    format: ImageFormat,
    dimensions: (u32, u32),
    color: ColorType,
}

#[derive(Debug, Clone)]
pub struct ImageValidator {
    pub max_file_size: usize,
    pub min_dimension: u32,
    pub max_dimension: u32,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            min_dimension: MIN_DIMENSION,
            max_dimension: MAX_DIMENSION,
        }
    }
}

impl ImageValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check size, encoding, and dimensions of `data`.
    pub fn validate_image(&self, data: &[u8]) -> ImageCheck {
        let mut issues = Vec::new();

        if data.len() > self.max_file_size {
            issues.push(ValidationIssue::major(
                "file_size",
                format!(
                    "Image exceeds maximum size ({:.1}MB > {:.1}MB)",
                    data.len() as f64 / 1024.0 / 1024.0,
                    self.max_file_size as f64 / 1024.0 / 1024.0
                ),
            ));
            return ImageCheck {
                valid: false,
                issues,
                format: None,
                dimensions: None,
            };
        }

        let probe = match probe(data) {
            Ok(probe) => probe,
            Err(issue) => {
                warn!(issue = %issue, "Image rejected");
                return ImageCheck {
                    valid: false,
                    issues: vec![issue],
                    format: None,
                    dimensions: None,
                };
            }
        };

        let (width, height) = probe.dimensions;
        let (min, max) = (self.min_dimension, self.max_dimension);

        if width < min || height < min {
            issues.push(ValidationIssue::major(
                "dimensions",
                format!("Image too small ({width}x{height} < {min}x{min})"),
            ));
        }
        if width > max || height > max {
            issues.push(ValidationIssue::major(
                "dimensions",
                format!("Image too large ({width}x{height} > {max}x{max})"),
            ));
        }

        if height > 0 {
            let aspect_ratio = width as f64 / height as f64;
            if !(0.5..=2.0).contains(&aspect_ratio) {
                issues.push(ValidationIssue::minor(
                    "aspect_ratio",
                    format!("Unusual aspect ratio: {aspect_ratio:.2}"),
                ));
            }
        }

        if !matches!(probe.color, ColorType::Rgb8 | ColorType::Rgba8) {
            issues.push(ValidationIssue::minor(
                "mode",
                format!("Unusual color mode: {:?}", probe.color),
            ));
        }

        ImageCheck {
            valid: !has_severity_at_least(&issues, Severity::Major),
            issues,
            format: Some(probe.format),
            dimensions: Some(probe.dimensions),
        }
    }

    /// Score `data` on format and resolution. Scores below `min_score` add a
    /// major issue.
    pub fn check_quality(&self, data: &[u8], min_score: f64) -> QualityCheck {
        let probe = match probe(data) {
            Ok(probe) => probe,
            Err(issue) => {
                return QualityCheck {
                    score: 0.0,
                    issues: vec![ValidationIssue::critical(
                        "quality",
                        format!("Failed to check quality: {}", issue.message),
                    )],
                }
            }
        };

        let mut score = 1.0;
        let mut issues = Vec::new();

        if probe.format == ImageFormat::Jpeg {
            score *= 0.9;
            issues.push(ValidationIssue::minor(
                "compression",
                "JPEG compression may reduce quality",
            ));
        }

        let (width, height) = probe.dimensions;
        let pixels = u64::from(width) * u64::from(height);
        if pixels < 512 * 512 {
            score *= 0.8;
            issues.push(ValidationIssue::minor("resolution", "Low resolution image"));
        } else if pixels < 1024 * 1024 {
            score *= 0.95;
        }

        if score < min_score {
            issues.push(ValidationIssue::major(
                "quality",
                format!("Quality score {score:.2} below threshold {min_score}"),
            ));
        }

        QualityCheck { score, issues }
    }
}

fn probe(data: &[u8]) -> Result<Probe, ValidationIssue> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ValidationIssue::critical("image", format!("Failed to read image: {e}")))?;

    let format = reader
        .format()
        .ok_or_else(|| ValidationIssue::critical("format", "Unrecognized image data"))?;

    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(ValidationIssue::critical(
            "format",
            format!("Unsupported format: {format:?}"),
        ));
    }

    let decoder = reader
        .into_decoder()
        .map_err(|e| ValidationIssue::critical("image", format!("Failed to decode image: {e}")))?;

    Ok(Probe {
        format,
        dimensions: decoder.dimensions(),
        color: decoder.color_type(),
    })
}
