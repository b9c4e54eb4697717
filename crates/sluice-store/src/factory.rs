//! Driver selection from a spooler definition.

use std::sync::Arc;

use sluice_types::{DriverKind, SpoolerDefinition};
use tracing::info;

use crate::error::StoreError;
use crate::local_store::LocalStore;
use crate::memory_store::MemoryStore;
use crate::traits::UploadStore;

/// Create and initialize the upload driver selected by a definition.
///
/// Rejects invalid definitions; never constructs a driver from one.
pub async fn create_store(
    definition: &SpoolerDefinition,
) -> Result<Arc<dyn UploadStore>, StoreError> {
    if !definition.is_valid() {
        return Err(StoreError::InvalidDefinition(format!(
            "{:?}",
            definition.driver
        )));
    }

    let store: Arc<dyn UploadStore> = match definition.driver {
        DriverKind::Local => Arc::new(LocalStore::new(&definition.driver_config)),
        DriverKind::Memory => Arc::new(MemoryStore::new()),
        DriverKind::Unknown => {
            return Err(StoreError::InvalidDefinition("unknown driver".to_string()));
        }
    };

    store.init().await?;
    info!(driver = store.name(), "upload driver initialized");
    Ok(store)
}
