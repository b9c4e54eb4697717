//! Core trait for backend upload drivers.

use bytes::Bytes;

use crate::error::StoreError;

/// A pluggable backend that persists byte blobs under slash-separated
/// object names.
///
/// Object names are either content-derived (`data/<xy>/<rest-of-hex>`)
/// or caller-supplied destination paths for direct uploads. All
/// implementations must be `Send + Sync`; the spooler calls them from
/// many concurrent upload tasks. A driver must report every put's
/// outcome, success or failure, and must never deadlock the caller.
#[async_trait::async_trait]
pub trait UploadStore: Send + Sync {
    /// Human-readable driver name, for logging.
    fn name(&self) -> &'static str;

    /// One-time setup before any uploads are issued.
    async fn init(&self) -> Result<(), StoreError>;

    /// Persist a blob under the given object name.
    async fn put(&self, object: &str, data: Bytes) -> Result<(), StoreError>;

    /// Retrieve a blob by object name. Returns `None` if not present.
    async fn get(&self, object: &str) -> Result<Option<Bytes>, StoreError>;

    /// Check whether an object already exists.
    async fn contains(&self, object: &str) -> Result<bool, StoreError>;

    /// Release driver resources. No puts may follow.
    async fn teardown(&self) -> Result<(), StoreError>;
}

/// Validate an object name: relative, no empty or `..` components.
pub(crate) fn check_object_name(object: &str) -> Result<(), StoreError> {
    let valid = !object.is_empty()
        && !object.starts_with('/')
        && object.split('/').all(|c| !c.is_empty() && c != "..");
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidObjectName(object.to_string()))
    }
}
