//! File-backed persistence for references and their image assets.
//!
//! Layout under the store root:
//!
//! ```text
//! <base>/characters/<name>.json          metadata record
//! <base>/characters/<name>_images/       sidecar image directory
//! <base>/characters/<name>_images/<key>.<ext>
//! <base>/locations/...
//! <base>/objects/...
//! <base>/styles/...
//! ```
//!
//! Every read, write, or delete of a path holds that path's mutex, so two
//! threads never write the same file at once and a reader never observes a
//! half-written record. Different references never contend.

mod locks;
mod sanitize;

pub use locks::PathLocks;
pub use sanitize::{sanitize_filename, UNNAMED};

use crate::error::{RefError, Result, StorageCause};
use crate::model::{Reference, ReferenceType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Suffix of a reference's sidecar image directory.
const IMAGE_DIR_SUFFIX: &str = "_images";

/// Extensions reported by [`ReferenceStorage::list_images`].
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// Aggregate numbers about what is on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageInfo {
    pub base_path: PathBuf,
    pub total_references: usize,
    pub references_by_type: BTreeMap<ReferenceType, usize>,
    pub total_images: usize,
    /// Total size of every file under the root, in bytes.
    pub storage_bytes: u64,
}

impl StorageInfo {
    pub fn storage_mb(&self) -> f64 {
        self.storage_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Result of an orphaned-image sweep.
#[derive(Debug, Clone, Default)]
pub struct OrphanCleanup {
    /// Directories that were removed.
    pub removed: Vec<PathBuf>,
    /// Directories (or type folders) that could not be processed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// File-based reference storage.
#[derive(Debug)]
pub struct ReferenceStorage {
    base_path: PathBuf,
    locks: PathLocks,
}

impl ReferenceStorage {
    /// Open (and create if needed) a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self {
            base_path: base_path.into(),
            locks: PathLocks::new(),
        };
        storage.ensure_directory_structure()?;
        Ok(storage)
    }

    fn ensure_directory_structure(&self) -> Result<()> {
        for ref_type in ReferenceType::ALL {
            let dir = self.type_dir(ref_type);
            fs::create_dir_all(&dir).map_err(|e| {
                RefError::storage(format!("Failed to create {}", dir.display()), e)
            })?;
            debug!(dir = %dir.display(), "Ensured directory exists");
        }
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding every reference of `ref_type`.
    pub fn type_dir(&self, ref_type: ReferenceType) -> PathBuf {
        self.base_path.join(ref_type.dir_name())
    }

    /// Path of the metadata file for `(ref_type, name)`.
    pub fn reference_path(&self, ref_type: ReferenceType, name: &str) -> PathBuf {
        self.type_dir(ref_type)
            .join(format!("{}.json", sanitize_filename(name)))
    }

    /// Path of the sidecar image directory for `(ref_type, name)`.
    pub fn image_dir(&self, ref_type: ReferenceType, name: &str) -> PathBuf {
        self.type_dir(ref_type)
            .join(format!("{}{IMAGE_DIR_SUFFIX}", sanitize_filename(name)))
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Write `reference`, replacing any existing record with the same name.
    ///
    /// The record is written to a temporary file and renamed into place, and
    /// the sidecar image directory is created if missing.
    pub fn save(&self, reference: &Reference) -> Result<()> {
        self.write(reference, false)
    }

    /// Like [`save`](Self::save) but fails with [`RefError::AlreadyExists`]
    /// if a record is already stored under the same name. The check and the
    /// write happen under the same path lock.
    pub fn save_new(&self, reference: &Reference) -> Result<()> {
        self.write(reference, true)
    }

    fn write(&self, reference: &Reference, must_be_new: bool) -> Result<()> {
        let ref_type = reference.ref_type();
        let name = reference.name();
        let path = self.reference_path(ref_type, name);

        self.locks
            .with_lock(&path, || -> Result<()> {
                if must_be_new && path.is_file() {
                    return Err(RefError::AlreadyExists(format!("{ref_type}/{name}")));
                }

                let content = serde_json::to_string_pretty(reference)
                    .map_err(|e| RefError::storage("Failed to encode reference", e))?;

                let type_dir = self.type_dir(ref_type);
                fs::create_dir_all(&type_dir)
                    .map_err(|e| RefError::storage("Failed to create type directory", e))?;

                let tmp = type_dir.join(format!("{}.json.tmp", sanitize_filename(name)));
                fs::write(&tmp, content)
                    .map_err(|e| RefError::storage("Failed to write reference", e))?;
                fs::rename(&tmp, &path)
                    .map_err(|e| RefError::storage("Failed to replace reference", e))?;

                fs::create_dir_all(self.image_dir(ref_type, name))
                    .map_err(|e| RefError::storage("Failed to create image directory", e))?;
                Ok(())
            })
            .inspect_err(|e| {
                if e.is_storage() {
                    error!(%ref_type, name, error = %e, "Failed to save reference");
                }
            })?;

        info!(%ref_type, name, "Saved reference");
        Ok(())
    }

    /// Read the reference stored under `(ref_type, name)`.
    ///
    /// Returns [`RefError::NotFound`] if there is no metadata file and
    /// [`RefError::Storage`] if the file exists but cannot be read or parsed.
    pub fn load(&self, ref_type: ReferenceType, name: &str) -> Result<Reference> {
        let path = self.reference_path(ref_type, name);
        if !path.is_file() {
            return Err(RefError::not_found(ref_type, name));
        }

        let reference = self.locks.with_lock(&path, || -> Result<Reference> {
            let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RefError::not_found(ref_type, name),
                _ => RefError::storage(format!("Failed to read {}", path.display()), e),
            })?;

            let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
                RefError::storage(format!("Invalid reference file {}", path.display()), e)
            })?;

            let reference = Reference::from_json_value(value).map_err(|e| {
                RefError::storage(
                    format!("Invalid reference file {}", path.display()),
                    StorageCause::Malformed(e.to_string()),
                )
            })?;

            if reference.ref_type() != ref_type {
                return Err(RefError::storage(
                    format!("Invalid reference file {}", path.display()),
                    StorageCause::Malformed(format!(
                        "expected a {ref_type} record, found {}",
                        reference.ref_type()
                    )),
                ));
            }

            Ok(reference)
        });

        match &reference {
            Ok(_) => debug!(%ref_type, name, "Loaded reference"),
            Err(e) if e.is_storage() => error!(%ref_type, name, error = %e, "Failed to load reference"),
            Err(_) => {}
        }
        reference
    }

    /// Remove the metadata file and the whole sidecar image directory.
    pub fn delete(&self, ref_type: ReferenceType, name: &str) -> Result<()> {
        let path = self.reference_path(ref_type, name);
        if !path.is_file() {
            return Err(RefError::not_found(ref_type, name));
        }

        self.locks.with_lock(&path, || -> Result<()> {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(RefError::not_found(ref_type, name));
                }
                Err(e) => return Err(RefError::storage("Failed to delete reference", e)),
            }

            let img_dir = self.image_dir(ref_type, name);
            if img_dir.exists() {
                fs::remove_dir_all(&img_dir)
                    .map_err(|e| RefError::storage("Failed to delete image directory", e))?;
            }
            Ok(())
        })?;

        info!(%ref_type, name, "Deleted reference");
        Ok(())
    }

    pub fn exists(&self, ref_type: ReferenceType, name: &str) -> bool {
        self.reference_path(ref_type, name).is_file()
    }

    /// List stored names, per type. `None` lists every type.
    ///
    /// Names come from the metadata filenames and are sorted.
    pub fn list(
        &self,
        ref_type: Option<ReferenceType>,
    ) -> Result<BTreeMap<ReferenceType, Vec<String>>> {
        let types: Vec<ReferenceType> = match ref_type {
            Some(t) => vec![t],
            None => ReferenceType::ALL.to_vec(),
        };

        let mut result = BTreeMap::new();
        for t in types {
            result.insert(t, self.list_type(t)?);
        }
        Ok(result)
    }

    fn list_type(&self, ref_type: ReferenceType) -> Result<Vec<String>> {
        let dir = self.type_dir(ref_type);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| RefError::storage(format!("Failed to list {}", dir.display()), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| RefError::storage(format!("Failed to list {}", dir.display()), e))?
                .path();
            let is_metadata = path.is_file() && path.extension().is_some_and(|e| e == "json");
            if let (true, Some(stem)) = (is_metadata, path.file_stem()) {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Store image bytes for a reference and return the stored filename.
    ///
    /// The filename is `<sanitized key>.<ext>` inside the reference's sidecar
    /// directory. Existing files with the same key and extension are replaced.
    ///
    /// The reference's metadata lock is held throughout, so a concurrent
    /// [`delete`](Self::delete) either runs first (and this fails with
    /// [`RefError::NotFound`]) or removes the new image along with the rest.
    pub fn save_image(
        &self,
        ref_type: ReferenceType,
        name: &str,
        image_key: &str,
        data: &[u8],
        ext: &str,
    ) -> Result<String> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        if ext.is_empty() || sanitize_filename(&ext) != ext {
            return Err(RefError::Validation(format!("Invalid image extension: {ext:?}")));
        }

        let metadata_path = self.reference_path(ref_type, name);
        let img_dir = self.image_dir(ref_type, name);
        let filename = format!("{}.{ext}", sanitize_filename(image_key));
        let img_path = img_dir.join(&filename);

        self.locks.with_lock(&metadata_path, || -> Result<()> {
            if !metadata_path.is_file() {
                return Err(RefError::not_found(ref_type, name));
            }

            fs::create_dir_all(&img_dir)
                .map_err(|e| RefError::storage("Failed to create image directory", e))?;

            self.locks
                .with_lock(&img_path, || fs::write(&img_path, data))
                .map_err(|e| {
                    error!(path = %img_path.display(), error = %e, "Failed to save image");
                    RefError::storage(format!("Failed to save image {}", img_path.display()), e)
                })
        })?;

        debug!(path = %img_path.display(), bytes = data.len(), "Saved image");
        Ok(filename)
    }

    /// Read a stored image by filename.
    pub fn load_image(&self, ref_type: ReferenceType, name: &str, filename: &str) -> Result<Vec<u8>> {
        let img_path = self.image_path(ref_type, name, filename)?;
        if !img_path.is_file() {
            return Err(RefError::NotFound(format!(
                "image {} for {ref_type}/{name}",
                filename
            )));
        }

        self.locks
            .with_lock(&img_path, || fs::read(&img_path))
            .map_err(|e| RefError::storage(format!("Failed to load image {}", img_path.display()), e))
    }

    /// Remove one stored image without touching the metadata record.
    pub fn delete_image(&self, ref_type: ReferenceType, name: &str, filename: &str) -> Result<()> {
        let img_path = self.image_path(ref_type, name, filename)?;
        if !img_path.is_file() {
            return Err(RefError::NotFound(format!(
                "image {} for {ref_type}/{name}",
                filename
            )));
        }

        self.locks
            .with_lock(&img_path, || fs::remove_file(&img_path))
            .map_err(|e| RefError::storage(format!("Failed to delete image {}", img_path.display()), e))?;

        debug!(path = %img_path.display(), "Deleted image");
        Ok(())
    }

    /// Sorted image filenames stored for a reference.
    pub fn list_images(&self, ref_type: ReferenceType, name: &str) -> Result<Vec<String>> {
        let img_dir = self.image_dir(ref_type, name);
        if !img_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&img_dir)
            .map_err(|e| RefError::storage(format!("Failed to list {}", img_dir.display()), e))?;

        let mut images = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| RefError::storage(format!("Failed to list {}", img_dir.display()), e))?
                .path();
            let is_image = path.is_file()
                && path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
            if let (true, Some(file_name)) = (is_image, path.file_name()) {
                images.push(file_name.to_string_lossy().into_owned());
            }
        }
        images.sort();
        Ok(images)
    }

    /// Resolve `filename` inside the sidecar directory, refusing anything
    /// that could escape it.
    fn image_path(&self, ref_type: ReferenceType, name: &str, filename: &str) -> Result<PathBuf> {
        if filename.is_empty() || sanitize_filename(filename) != filename {
            return Err(RefError::Validation(format!(
                "Invalid image filename: {filename:?}"
            )));
        }
        Ok(self.image_dir(ref_type, name).join(filename))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Count references and images and measure the store's size on disk.
    pub fn info(&self) -> Result<StorageInfo> {
        let mut references_by_type = BTreeMap::new();
        let mut total_references = 0;
        let mut total_images = 0;

        for (ref_type, names) in self.list(None)? {
            total_references += names.len();
            for name in &names {
                total_images += self.list_images(ref_type, name)?.len();
            }
            references_by_type.insert(ref_type, names.len());
        }

        let storage_bytes = dir_size(&self.base_path).unwrap_or_else(|e| {
            warn!(error = %e, "Could not calculate storage size");
            0
        });

        Ok(StorageInfo {
            base_path: self.base_path.clone(),
            total_references,
            references_by_type,
            total_images,
            storage_bytes,
        })
    }

    /// Remove sidecar directories whose metadata file no longer exists.
    ///
    /// Best effort: a directory that cannot be removed is recorded in
    /// [`OrphanCleanup::failures`] and the sweep continues.
    pub fn cleanup_orphaned_images(&self) -> OrphanCleanup {
        let mut report = OrphanCleanup::default();

        for ref_type in ReferenceType::ALL {
            let type_dir = self.type_dir(ref_type);
            if !type_dir.is_dir() {
                continue;
            }

            let entries = match fs::read_dir(&type_dir) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(dir = %type_dir.display(), error = %e, "Failed to scan for orphaned images");
                    report.failures.push((type_dir, e.to_string()));
                    continue;
                }
            };

            for entry in entries.flatten() {
                let dir = entry.path();
                let Some(ref_name) = dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_suffix(IMAGE_DIR_SUFFIX))
                    .map(str::to_owned)
                else {
                    continue;
                };
                if !dir.is_dir() {
                    continue;
                }

                let metadata = type_dir.join(format!("{ref_name}.json"));
                // Hold the metadata lock so a concurrent save cannot recreate
                // the reference between the check and the removal.
                let outcome = self.locks.with_lock(&metadata, || {
                    if metadata.exists() {
                        Ok(false)
                    } else {
                        fs::remove_dir_all(&dir).map(|()| true)
                    }
                });

                match outcome {
                    Ok(true) => {
                        info!(dir = %dir.display(), "Removed orphaned image directory");
                        report.removed.push(dir);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!(dir = %dir.display(), error = %e, "Failed to remove orphaned directory");
                        report.failures.push((dir, e.to_string()));
                    }
                }
            }
        }

        report
    }
}

/// Recursive size of every regular file under `path`.
fn dir_size(path: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}
