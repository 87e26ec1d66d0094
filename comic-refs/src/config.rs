//! Store configuration.

use crate::error::{RefError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default store root, relative to the working directory.
pub const DEFAULT_BASE_PATH: &str = "references";
pub const DEFAULT_CACHE_SIZE: usize = 50;
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 30;

pub const ENV_STORE_PATH: &str = "REFERENCE_STORE_PATH";
pub const ENV_CACHE_SIZE: &str = "REFERENCE_CACHE_SIZE";
pub const ENV_CACHE_TTL_MINUTES: &str = "REFERENCE_CACHE_TTL_MINUTES";
pub const ENV_VALIDATE_IMAGES: &str = "REFERENCE_VALIDATE_IMAGES";

/// Configuration for a [`ReferenceManager`](crate::ReferenceManager).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Root directory of the store.
    pub base_path: PathBuf,

    /// Maximum number of cached references.
    pub cache_size: usize,

    /// How long a cached reference may go unread before it is reloaded.
    pub cache_ttl: Duration,

    /// Check attached images for size, format and dimensions.
    pub validate_images: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PATH)
    }
}

impl StoreConfig {
    /// Create a config rooted at `base_path` with default cache settings.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_MINUTES * 60),
            validate_images: true,
        }
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_validate_images(mut self, validate: bool) -> Self {
        self.validate_images = validate;
        self
    }

    /// Build a config from the process environment, loading `.env` first.
    ///
    /// Unset variables keep their defaults; malformed values are an error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_STORE_PATH).filter(|p| !p.trim().is_empty()) {
            config.base_path = PathBuf::from(path);
        }
        if let Some(size) = lookup(ENV_CACHE_SIZE) {
            config.cache_size = parse_number(ENV_CACHE_SIZE, &size)?;
        }
        if let Some(minutes) = lookup(ENV_CACHE_TTL_MINUTES) {
            let minutes: u64 = parse_number(ENV_CACHE_TTL_MINUTES, &minutes)?;
            config.cache_ttl = Duration::from_secs(minutes.saturating_mul(60));
        }
        if let Some(flag) = lookup(ENV_VALIDATE_IMAGES) {
            config.validate_images = parse_bool(ENV_VALIDATE_IMAGES, &flag)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RefError::Validation(format!("{key} must be a non-negative integer, got {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RefError::Validation(format!(
            "{key} must be true or false, got {value:?}"
        ))),
    }
}
