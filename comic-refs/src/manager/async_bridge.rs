//! Async front end for the blocking manager.

use super::{CleanupReport, ImageSet, ManagerStats, ReferenceManager};
use crate::error::{RefError, Result, StorageCause};
use crate::model::{Reference, ReferenceType, ReferenceUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs [`ReferenceManager`] operations on tokio's blocking thread pool so
/// file I/O never stalls the async executor.
#[derive(Debug, Clone)]
pub struct AsyncReferenceManager {
    inner: Arc<ReferenceManager>,
}

impl AsyncReferenceManager {
    pub fn new(manager: ReferenceManager) -> Self {
        Self {
            inner: Arc::new(manager),
        }
    }

    pub fn from_shared(manager: Arc<ReferenceManager>) -> Self {
        Self { inner: manager }
    }

    /// The wrapped manager, for synchronous callers sharing the same cache.
    pub fn inner(&self) -> &Arc<ReferenceManager> {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&ReferenceManager) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let manager = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(manager.as_ref()))
            .await
            .map_err(|e| RefError::storage("Background task failed", StorageCause::Task(e.to_string())))?
    }

    pub async fn create_reference(
        &self,
        ref_type: ReferenceType,
        name: impl Into<String>,
        description: impl Into<String>,
        fields: ReferenceUpdate,
    ) -> Result<Arc<Reference>> {
        let (name, description) = (name.into(), description.into());
        self.run(move |m| m.create_reference(ref_type, &name, &description, fields))
            .await
    }

    pub async fn get_reference(
        &self,
        ref_type: ReferenceType,
        name: impl Into<String>,
        use_cache: bool,
    ) -> Result<Option<Arc<Reference>>> {
        let name = name.into();
        self.run(move |m| m.get_reference(ref_type, &name, use_cache))
            .await
    }

    pub async fn update_reference(
        &self,
        ref_type: ReferenceType,
        name: impl Into<String>,
        update: ReferenceUpdate,
    ) -> Result<Arc<Reference>> {
        let name = name.into();
        self.run(move |m| m.update_reference(ref_type, &name, update))
            .await
    }

    pub async fn delete_reference(&self, ref_type: ReferenceType, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.run(move |m| m.delete_reference(ref_type, &name)).await
    }

    pub async fn list_references(
        &self,
        ref_type: Option<ReferenceType>,
        tags: Option<Vec<String>>,
    ) -> Result<BTreeMap<ReferenceType, Vec<String>>> {
        self.run(move |m| m.list_references(ref_type, tags.as_deref()))
            .await
    }

    pub async fn find_in_text(
        &self,
        text: impl Into<String>,
        types: Option<Vec<ReferenceType>>,
    ) -> Result<BTreeMap<ReferenceType, Vec<String>>> {
        let text = text.into();
        self.run(move |m| m.find_in_text(&text, types.as_deref()))
            .await
    }

    pub async fn attach_image(
        &self,
        ref_type: ReferenceType,
        name: impl Into<String>,
        image_key: impl Into<String>,
        data: Vec<u8>,
        ext: impl Into<String>,
    ) -> Result<String> {
        let (name, image_key, ext) = (name.into(), image_key.into(), ext.into());
        self.run(move |m| m.attach_image(ref_type, &name, &image_key, &data, &ext))
            .await
    }

    pub async fn get_character_images(&self, names: Vec<String>) -> Result<BTreeMap<String, ImageSet>> {
        self.run(move |m| m.get_character_images(&names)).await
    }

    pub async fn get_location_images(&self, names: Vec<String>) -> Result<BTreeMap<String, ImageSet>> {
        self.run(move |m| m.get_location_images(&names)).await
    }

    pub async fn cleanup_unused(&self, days_unused: u32) -> Result<CleanupReport> {
        self.run(move |m| m.cleanup_unused(days_unused)).await
    }

    pub async fn statistics(&self) -> Result<ManagerStats> {
        self.run(|m| m.statistics()).await
    }
}
