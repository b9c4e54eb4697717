//! Shared test utilities for sluice-engine tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sluice_store::{MemoryStore, UploadStore};
use sluice_types::{SpoolerDefinition, SpoolerResult};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::Spooler;

pub const TEST_MIN_CHUNK: u64 = 4 * 1024;
pub const TEST_AVG_CHUNK: u64 = 16 * 1024;
pub const TEST_MAX_CHUNK: u64 = 64 * 1024;

/// Generate deterministic, non-repeating test data.
pub fn test_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0xDEAD_BEEF;
    for _ in 0..size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 16) as u8);
    }
    data
}

/// A chunking-enabled definition with small test bounds.
pub fn chunked_definition(definition: &str, scratch: &Path) -> SpoolerDefinition {
    SpoolerDefinition::with_chunking(
        definition,
        scratch,
        true,
        TEST_MIN_CHUNK,
        TEST_AVG_CHUNK,
        TEST_MAX_CHUNK,
    )
}

/// A memory-backed spooler plus a handle onto its store.
pub async fn memory_spooler(dir: &TempDir) -> (Spooler, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let definition = chunked_definition("mem:", &dir.path().join("scratch"));
    let spooler = Spooler::with_store(definition, Arc::clone(&store) as Arc<dyn UploadStore>)
        .await
        .unwrap();
    (spooler, store)
}

/// A spooler over an arbitrary pre-built store.
pub async fn spooler_over(dir: &TempDir, store: Arc<dyn UploadStore>) -> Spooler {
    let definition = chunked_definition("mem:", &dir.path().join("scratch"));
    Spooler::with_store(definition, store).await.unwrap()
}

pub async fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    tokio::fs::write(&path, data).await.unwrap();
    path
}

/// Receive exactly `n` results, failing the test on a stall.
pub async fn collect_results(
    rx: &mut UnboundedReceiver<SpoolerResult>,
    n: usize,
) -> Vec<SpoolerResult> {
    let mut results = Vec::with_capacity(n);
    for _ in 0..n {
        let result = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for a spooler result")
            .expect("result channel closed early");
        results.push(result);
    }
    results
}
