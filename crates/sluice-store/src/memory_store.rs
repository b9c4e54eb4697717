//! In-memory upload driver.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::{check_object_name, UploadStore};

/// In-memory driver backed by a `RwLock<HashMap>`.
///
/// Stands in for a remote key-value backend in tests and memory-only
/// deployments; it satisfies the same [`UploadStore`] contract as the
/// file-backed driver.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl UploadStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put(&self, object: &str, data: Bytes) -> Result<(), StoreError> {
        check_object_name(object)?;
        debug!(object, size = data.len(), "storing object in memory");
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(object.to_string(), data);
        Ok(())
    }

    async fn get(&self, object: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .get(object)
            .cloned())
    }

    async fn contains(&self, object: &str) -> Result<bool, StoreError> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(object))
    }

    async fn teardown(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
