//! Reference consistency store for AI-generated comic art.
//!
//! Keeps recurring characters, locations, objects, and art styles looking
//! the same from panel to panel. Each reference is a typed metadata record
//! plus a directory of keyed sidecar images:
//! - Typed references with per-variant validation ([`model`])
//! - File-backed storage with per-path locking ([`storage`])
//! - Quality and consistency checks ([`validation`])
//! - A cached manager with free-text lookup and age-based cleanup ([`manager`])
//!
//! # Quick Start
//!
//! ```ignore
//! use comic_refs::{ReferenceManager, ReferenceType, ReferenceUpdate, StoreConfig};
//!
//! fn main() -> comic_refs::Result<()> {
//!     let manager = ReferenceManager::from_config(&StoreConfig::from_env()?)?;
//!
//!     manager.create_reference(
//!         ReferenceType::Character,
//!         "Hero",
//!         "A brave adventurer with a red scarf",
//!         ReferenceUpdate::empty(ReferenceType::Character),
//!     )?;
//!
//!     let mentioned = manager.find_in_text("Hero enters the Forest at dawn", None)?;
//!     println!("{mentioned:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod storage;
pub mod validation;

// Primary public API
pub use config::StoreConfig;
pub use error::{RefError, Result, StorageCause};
pub use manager::{
    AsyncReferenceManager, CleanupReport, ImageSet, ManagerStats, ReferenceManager,
};
pub use model::{
    CharacterReference, CharacterUpdate, LocationReference, LocationType, LocationUpdate,
    ObjectReference, ObjectUpdate, Reference, ReferenceHeader, ReferenceType, ReferenceUpdate,
    SizeCategory, StyleGuide, StyleGuideUpdate,
};
pub use storage::{sanitize_filename, OrphanCleanup, ReferenceStorage, StorageInfo};
pub use validation::{
    ConsistencyValidator, ImageValidator, ReferenceValidator, Severity, ValidationIssue,
    ValidationReport,
};
