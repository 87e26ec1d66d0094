//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use comic_refs::{ReferenceManager, ReferenceType, ReferenceUpdate, StoreConfig};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;

/// A manager rooted in a temporary directory that lives as long as it does.
pub struct TestStore {
    pub manager: ReferenceManager,
    pub temp_dir: TempDir,
}

/// Install a test subscriber once. Set `RUST_LOG=comic_refs=debug` to see logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn store() -> TestStore {
    store_with(|config| config)
}

pub fn store_with(customize: impl FnOnce(StoreConfig) -> StoreConfig) -> TestStore {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config = customize(StoreConfig::new(temp_dir.path().join("references")));
    let manager = ReferenceManager::from_config(&config).expect("Failed to open store");
    TestStore { manager, temp_dir }
}

pub fn store_with_cache(size: usize, ttl: Duration) -> TestStore {
    store_with(|config| config.with_cache_size(size).with_cache_ttl(ttl))
}

/// Create a reference with only a name and description.
pub fn create(manager: &ReferenceManager, ref_type: ReferenceType, name: &str) {
    manager
        .create_reference(
            ref_type,
            name,
            &format!("Reference sheet for {name}"),
            ReferenceUpdate::empty(ref_type),
        )
        .expect("Failed to create reference");
}

/// Rewrite a stored record's `updated_at` to `days` ago, bypassing the manager.
pub fn backdate(manager: &ReferenceManager, ref_type: ReferenceType, name: &str, days: i64) {
    let path = manager.storage().reference_path(ref_type, name);
    let text = std::fs::read_to_string(&path).expect("Failed to read record");
    let mut record: serde_json::Value = serde_json::from_str(&text).expect("Invalid record");
    let when = Utc::now() - ChronoDuration::days(days);
    record["updated_at"] = serde_json::json!(when.to_rfc3339());
    std::fs::write(&path, serde_json::to_string_pretty(&record).unwrap())
        .expect("Failed to write record");
}

/// Rewrite one field of a stored record, bypassing the manager.
pub fn edit_on_disk(
    manager: &ReferenceManager,
    ref_type: ReferenceType,
    name: &str,
    field: &str,
    value: serde_json::Value,
) {
    let path = manager.storage().reference_path(ref_type, name);
    let text = std::fs::read_to_string(&path).expect("Failed to read record");
    let mut record: serde_json::Value = serde_json::from_str(&text).expect("Invalid record");
    record[field] = value;
    std::fs::write(&path, serde_json::to_string_pretty(&record).unwrap())
        .expect("Failed to write record");
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .expect("Failed to encode test image");
    cursor.into_inner()
}

/// A solid-color PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, image::Rgb([40, 40, 200]));
    encode(DynamicImage::ImageRgb8(image), ImageFormat::Jpeg)
}
