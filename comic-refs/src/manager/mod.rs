//! The reference manager: the API the generation pipeline and CLI talk to.
//!
//! The manager puts a cache, name rules, and validation in front of
//! [`ReferenceStorage`]. Storage is always authoritative. Every write goes
//! straight to disk and then drops the cached copy, so a later read can
//! never see data from before the write.

mod async_bridge;
mod cache;
mod lookup;

pub use async_bridge::AsyncReferenceManager;
pub use cache::ReferenceCache;
pub use lookup::names_in_text;

use crate::config::StoreConfig;
use crate::error::{RefError, Result};
use crate::model::{Reference, ReferenceType, ReferenceUpdate};
use crate::storage::{sanitize_filename, OrphanCleanup, ReferenceStorage, StorageInfo};
use crate::validation::{
    ConsistencyValidator, ImageValidator, ReferenceValidator, ValidationIssue, ValidationReport,
    NAME_PATTERN,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Types scanned by [`ReferenceManager::find_in_text`] when none are given.
/// Style guides are never named in story text.
pub const TEXT_SEARCH_TYPES: [ReferenceType; 3] = [
    ReferenceType::Character,
    ReferenceType::Location,
    ReferenceType::Object,
];

/// Image-key to bytes for one reference.
pub type ImageSet = BTreeMap<String, Vec<u8>>;

/// What [`ReferenceManager::cleanup_unused`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<(ReferenceType, String)>,
    /// References that could not be read or deleted, with the reason.
    pub failures: Vec<(ReferenceType, String, String)>,
}

/// Snapshot of the store and cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerStats {
    pub total_references: usize,
    pub references_by_type: BTreeMap<ReferenceType, usize>,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub cache_hit_rate: f64,
    pub storage: StorageInfo,
}

/// Cached, validated access to stored references.
#[derive(Debug)]
pub struct ReferenceManager {
    storage: ReferenceStorage,
    cache: ReferenceCache,
    validator: ReferenceValidator,
    image_validator: Option<ImageValidator>,
}

impl ReferenceManager {
    /// Open the store described by `config`, creating directories as needed.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let storage = ReferenceStorage::new(&config.base_path)?;
        Ok(Self::with_storage(storage, config))
    }

    /// Wrap an already opened storage. `config.base_path` is ignored.
    pub fn with_storage(storage: ReferenceStorage, config: &StoreConfig) -> Self {
        info!(
            base_path = %storage.base_path().display(),
            cache_size = config.cache_size,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Initialized reference manager"
        );
        Self {
            storage,
            cache: ReferenceCache::new(config.cache_size, config.cache_ttl),
            validator: ReferenceValidator::new(),
            image_validator: config.validate_images.then(ImageValidator::new),
        }
    }

    pub fn storage(&self) -> &ReferenceStorage {
        &self.storage
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    // =========================================================================
    // CRUD
    // =========================================================================

    /// Create and store a new reference.
    ///
    /// `fields` sets the optional fields and must be of the same type as
    /// `ref_type`. Fails with [`RefError::InvalidName`] if the name breaks
    /// the naming pattern and [`RefError::AlreadyExists`] if the name is
    /// taken.
    pub fn create_reference(
        &self,
        ref_type: ReferenceType,
        name: &str,
        description: &str,
        fields: ReferenceUpdate,
    ) -> Result<Arc<Reference>> {
        if !is_valid_name(name) {
            return Err(RefError::InvalidName {
                ref_type,
                name: name.to_string(),
            });
        }

        let mut reference = Reference::new(ref_type, name, description);
        fields.apply_to(&mut reference)?;
        reference.validate()?;

        self.storage.save_new(&reference)?;

        let reference = Arc::new(reference);
        self.cache.insert(Arc::clone(&reference));
        info!(%ref_type, name, "Created reference");
        Ok(reference)
    }

    /// Fetch a reference, from cache when allowed and fresh.
    ///
    /// A missing reference is `Ok(None)`. A file that exists but cannot be
    /// read is an error.
    pub fn get_reference(
        &self,
        ref_type: ReferenceType,
        name: &str,
        use_cache: bool,
    ) -> Result<Option<Arc<Reference>>> {
        if use_cache {
            if let Some(reference) = self.cache.get(ref_type, name) {
                return Ok(Some(reference));
            }
        }

        match self.storage.load(ref_type, name) {
            Ok(reference) => {
                let reference = Arc::new(reference);
                if use_cache {
                    self.cache.insert(Arc::clone(&reference));
                }
                Ok(Some(reference))
            }
            Err(e) if e.is_not_found() => {
                debug!(%ref_type, name, "Reference not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Merge `update` into the stored reference and persist it.
    ///
    /// The current record is read from storage, not the cache. The merged
    /// reference is validated before anything is written.
    pub fn update_reference(
        &self,
        ref_type: ReferenceType,
        name: &str,
        update: ReferenceUpdate,
    ) -> Result<Arc<Reference>> {
        let mut reference = self.storage.load(ref_type, name)?;

        update.apply_to(&mut reference)?;
        reference.validate()?;
        reference.touch();

        self.storage.save(&reference)?;
        self.cache.invalidate(ref_type, name);

        info!(%ref_type, name, "Updated reference");
        Ok(Arc::new(reference))
    }

    /// Delete a reference and all its images.
    pub fn delete_reference(&self, ref_type: ReferenceType, name: &str) -> Result<()> {
        let result = self.storage.delete(ref_type, name);
        self.cache.invalidate(ref_type, name);
        result?;

        info!(%ref_type, name, "Deleted reference");
        Ok(())
    }

    /// List names per type, optionally keeping only references carrying at
    /// least one of `tags`.
    ///
    /// Tag filtering loads every candidate.
    pub fn list_references(
        &self,
        ref_type: Option<ReferenceType>,
        tags: Option<&[String]>,
    ) -> Result<BTreeMap<ReferenceType, Vec<String>>> {
        let mut listing = self.storage.list(ref_type)?;

        let Some(tags) = tags.filter(|t| !t.is_empty()) else {
            return Ok(listing);
        };

        for (t, names) in listing.iter_mut() {
            let mut kept = Vec::with_capacity(names.len());
            for name in names.drain(..) {
                if let Some(reference) = self.get_reference(*t, &name, true)? {
                    if reference.header().has_any_tag(tags) {
                        kept.push(name);
                    }
                }
            }
            *names = kept;
        }

        Ok(listing)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find stored reference names mentioned in `text`.
    ///
    /// Scans `types`, or character, location and object references when
    /// `None`. Only types with at least one match appear in the result.
    pub fn find_in_text(
        &self,
        text: &str,
        types: Option<&[ReferenceType]>,
    ) -> Result<BTreeMap<ReferenceType, Vec<String>>> {
        let types = types.unwrap_or(&TEXT_SEARCH_TYPES);
        let mut found = BTreeMap::new();

        for &t in types {
            let listing = self.storage.list(Some(t))?;
            let names = listing.get(&t).map(Vec::as_slice).unwrap_or_default();
            let matches = names_in_text(text, names);
            if !matches.is_empty() {
                found.insert(t, matches);
            }
        }

        debug!(matches = found.values().map(Vec::len).sum::<usize>(), "Searched text for references");
        Ok(found)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Store image bytes for a reference and record them under `image_key`.
    ///
    /// When image validation is enabled, bytes that fail it are rejected
    /// before anything is written. Returns the stored filename.
    pub fn attach_image(
        &self,
        ref_type: ReferenceType,
        name: &str,
        image_key: &str,
        data: &[u8],
        ext: &str,
    ) -> Result<String> {
        if ref_type == ReferenceType::StyleGuide {
            return Err(RefError::Validation(
                "Style guides do not store keyed images".to_string(),
            ));
        }

        if let Some(validator) = &self.image_validator {
            let check = validator.validate_image(data);
            if !check.valid {
                let reasons: Vec<String> = check.issues.iter().map(|i| i.to_string()).collect();
                return Err(RefError::Validation(format!(
                    "Image rejected: {}",
                    reasons.join("; ")
                )));
            }
        }

        let mut reference = self.storage.load(ref_type, name)?;
        let filename = self
            .storage
            .save_image(ref_type, name, image_key, data, ext)?;

        if let Some(images) = reference.images_mut() {
            images.insert(image_key.to_string(), filename.clone());
        }
        reference.touch();
        self.storage.save(&reference)?;
        self.cache.invalidate(ref_type, name);

        info!(%ref_type, name, image_key, filename = %filename, "Attached image");
        Ok(filename)
    }

    /// Forget the image stored under `image_key` and delete its file.
    ///
    /// Returns false if the reference had no such key.
    pub fn remove_image(&self, ref_type: ReferenceType, name: &str, image_key: &str) -> Result<bool> {
        let mut reference = self.storage.load(ref_type, name)?;
        let Some(filename) = reference.images_mut().and_then(|m| m.remove(image_key)) else {
            return Ok(false);
        };

        match self.storage.delete_image(ref_type, name, &filename) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(%ref_type, name, filename = %filename, "Image file was already gone");
            }
            Err(e) => return Err(e),
        }

        reference.touch();
        self.storage.save(&reference)?;
        self.cache.invalidate(ref_type, name);
        Ok(true)
    }

    /// Load every recorded image for each of `names`.
    ///
    /// Missing references are skipped. Images that cannot be read are logged
    /// and left out.
    pub fn get_images(
        &self,
        ref_type: ReferenceType,
        names: &[String],
    ) -> Result<BTreeMap<String, ImageSet>> {
        let mut result = BTreeMap::new();

        for name in names {
            let Some(reference) = self.get_reference(ref_type, name, true)? else {
                continue;
            };

            let mut images = ImageSet::new();
            for (key, filename) in reference.images().into_iter().flatten() {
                match self.storage.load_image(ref_type, name, filename) {
                    Ok(data) => {
                        images.insert(key.clone(), data);
                    }
                    Err(e) => {
                        warn!(%ref_type, name = %name, filename = %filename, error = %e, "Could not load image");
                    }
                }
            }
            result.insert(name.clone(), images);
        }

        Ok(result)
    }

    pub fn get_character_images(&self, names: &[String]) -> Result<BTreeMap<String, ImageSet>> {
        self.get_images(ReferenceType::Character, names)
    }

    pub fn get_location_images(&self, names: &[String]) -> Result<BTreeMap<String, ImageSet>> {
        self.get_images(ReferenceType::Location, names)
    }

    // =========================================================================
    // Validation and maintenance
    // =========================================================================

    /// Map of `type/name` to the reason for every stored record that does
    /// not load or validate.
    pub fn validate_all_references(&self) -> Result<BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();

        for (t, names) in self.storage.list(None)? {
            for name in names {
                let outcome = self
                    .storage
                    .load(t, &name)
                    .and_then(|reference| reference.validate());
                if let Err(e) = outcome {
                    errors.insert(format!("{t}/{name}"), e.to_string());
                }
            }
        }

        Ok(errors)
    }

    /// Grade every stored reference and image and check them against each
    /// other.
    pub fn validation_report(&self, strict: bool) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();
        let image_validator = self.image_validator.clone().unwrap_or_default();
        let mut loaded = Vec::new();

        for (t, names) in self.storage.list(None)? {
            for name in names {
                let id = format!("{t}/{name}");
                let reference = match self.storage.load(t, &name) {
                    Ok(reference) => reference,
                    Err(e) => {
                        report.add_reference_result(
                            id,
                            false,
                            vec![ValidationIssue::critical("general", e.to_string())],
                        );
                        continue;
                    }
                };

                let (valid, issues) = self.validator.validate_reference(&reference, strict);
                report.add_reference_result(id.clone(), valid, issues);

                for filename in self.storage.list_images(t, &name)? {
                    let check = match self.storage.load_image(t, &name, &filename) {
                        Ok(data) => image_validator.validate_image(&data),
                        Err(e) => {
                            warn!(id = %id, filename = %filename, error = %e, "Could not read image");
                            continue;
                        }
                    };
                    report.add_image_result(format!("{id}/{filename}"), check.valid, check.issues);
                }

                loaded.push(reference);
            }
        }

        report.set_consistency_issues(ConsistencyValidator::new().check_consistency(&loaded));
        Ok(report)
    }

    /// Delete every reference not updated in the last `days_unused` days.
    ///
    /// Best effort: a reference that cannot be read or deleted is recorded
    /// in the report and the pass continues.
    pub fn cleanup_unused(&self, days_unused: u32) -> Result<CleanupReport> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(days_unused));
        let mut report = CleanupReport::default();

        for (t, names) in self.storage.list(None)? {
            for name in names {
                let reference = match self.storage.load(t, &name) {
                    Ok(reference) => reference,
                    Err(e) => {
                        warn!(ref_type = %t, name = %name, error = %e, "Skipping unreadable reference during cleanup");
                        report.failures.push((t, name, e.to_string()));
                        continue;
                    }
                };

                if reference.header().updated_at >= cutoff {
                    continue;
                }

                match self.delete_reference(t, &name) {
                    Ok(()) => report.removed.push((t, name)),
                    Err(e) => {
                        warn!(ref_type = %t, name = %name, error = %e, "Failed to remove unused reference");
                        report.failures.push((t, name, e.to_string()));
                    }
                }
            }
        }

        info!(
            removed = report.removed.len(),
            failures = report.failures.len(),
            "Cleaned up unused references"
        );
        Ok(report)
    }

    /// Remove image directories left behind by out-of-band deletes.
    pub fn cleanup_orphaned_images(&self) -> OrphanCleanup {
        self.storage.cleanup_orphaned_images()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cleared reference cache");
    }

    pub fn statistics(&self) -> Result<ManagerStats> {
        let storage = self.storage.info()?;
        Ok(ManagerStats {
            total_references: storage.total_references,
            references_by_type: storage.references_by_type.clone(),
            cache_entries: self.cache.len(),
            cache_capacity: self.cache.capacity(),
            cache_hit_rate: self.cache.hit_rate(),
            storage,
        })
    }
}

/// Names start with a letter, use only letters, digits, `_`, `-` and spaces,
/// and are stored under exactly their own spelling.
fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name) && sanitize_filename(name) == name
}
