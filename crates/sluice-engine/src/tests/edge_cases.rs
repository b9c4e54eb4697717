//! Edge cases: failures, cleanup, and degenerate inputs.

use std::path::Path;
use std::sync::Arc;

use sluice_store::{FaultStore, MemoryStore, UploadStore};
use sluice_types::code;
use tempfile::TempDir;

use super::helpers::{collect_results, memory_spooler, spooler_over, test_data, write_file};

async fn scratch_entries(dir: &TempDir) -> usize {
    let scratch = dir.path().join("scratch");
    let mut entries = tokio::fs::read_dir(&scratch).await.unwrap();
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

#[tokio::test]
async fn test_upload_missing_source() {
    let dir = TempDir::new().unwrap();
    let (spooler, store) = memory_spooler(&dir).await;
    let mut rx = spooler.subscribe_channel();

    spooler
        .upload(Path::new("/no/such/source.bin"), "dest/object")
        .unwrap();
    spooler.wait_for_upload().await;

    let result = collect_results(&mut rx, 1).await.remove(0);
    assert_eq!(result.return_code, code::READ_FAILURE);
    assert!(store.is_empty());
    assert_eq!(spooler.num_errors(), 1);
}

#[tokio::test]
async fn test_scratch_space_reclaimed_on_success() {
    let dir = TempDir::new().unwrap();
    let (spooler, _store) = memory_spooler(&dir).await;

    for i in 0..3 {
        let input = write_file(&dir, &format!("f{i}.bin"), &test_data(100 * 1024 + i)).await;
        spooler.process(&input).unwrap();
    }
    spooler.wait_for_upload().await;

    assert_eq!(
        scratch_entries(&dir).await,
        0,
        "successful requests must leave no scratch artifacts"
    );
}

#[tokio::test]
async fn test_scratch_space_kept_on_upload_failure() {
    let dir = TempDir::new().unwrap();
    // Every put fails.
    let store = Arc::new(
        FaultStore::new(Arc::new(MemoryStore::new())).fail_puts(&(0u64..64).collect::<Vec<u64>>()),
    );
    let spooler = spooler_over(&dir, store as Arc<dyn UploadStore>).await;
    let mut rx = spooler.subscribe_channel();

    let input = write_file(&dir, "f.bin", &test_data(100 * 1024)).await;
    spooler.process(&input).unwrap();
    spooler.wait_for_upload().await;

    let result = collect_results(&mut rx, 1).await.remove(0);
    assert_eq!(result.return_code, code::UPLOAD_FAILURE);
    // Failed artifacts stay behind for inspection.
    assert!(scratch_entries(&dir).await > 0);
}

#[tokio::test]
async fn test_error_count_accumulates() {
    let dir = TempDir::new().unwrap();
    let (spooler, _store) = memory_spooler(&dir).await;

    spooler.process(Path::new("/missing/one")).unwrap();
    spooler.process(Path::new("/missing/two")).unwrap();
    let ok = write_file(&dir, "ok.bin", &test_data(100)).await;
    spooler.process(&ok).unwrap();
    spooler.wait_for_upload().await;

    assert_eq!(spooler.num_errors(), 2);
}

#[tokio::test]
async fn test_termination_preserves_error_count() {
    let dir = TempDir::new().unwrap();
    let (spooler, _store) = memory_spooler(&dir).await;

    spooler.process(Path::new("/missing/input")).unwrap();
    spooler.wait_for_termination().await.unwrap();
    assert_eq!(spooler.num_errors(), 1);
}

#[tokio::test]
async fn test_single_byte_file() {
    let dir = TempDir::new().unwrap();
    let (spooler, store) = memory_spooler(&dir).await;
    let mut rx = spooler.subscribe_channel();

    let input = write_file(&dir, "one.bin", b"x").await;
    spooler.process(&input).unwrap();
    spooler.wait_for_upload().await;

    let result = collect_results(&mut rx, 1).await.remove(0);
    assert!(result.is_ok());
    assert!(!result.is_chunked());
    assert_eq!(store.len(), 1);
}
