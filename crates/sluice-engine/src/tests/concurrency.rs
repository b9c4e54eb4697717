//! Concurrent spooling and fault injection.

use std::collections::HashSet;
use std::sync::Arc;

use sluice_store::{FaultStore, MemoryStore, UploadStore};
use sluice_types::code;
use tempfile::TempDir;

use super::helpers::{collect_results, memory_spooler, spooler_over, test_data, write_file};

#[tokio::test(flavor = "multi_thread")]
async fn test_many_concurrent_files_one_result_each() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        FaultStore::new(Arc::new(MemoryStore::new()))
            .put_latency(1, 5)
            .seed(7),
    );
    let spooler = spooler_over(&dir, Arc::clone(&store) as Arc<dyn UploadStore>).await;
    let mut rx = spooler.subscribe_channel();

    let count = 20;
    let mut inputs = Vec::new();
    for i in 0..count {
        // Distinct sizes give distinct content, some above the chunk
        // minimum and some below.
        let input = write_file(&dir, &format!("file-{i}.bin"), &test_data(1024 * (i + 1))).await;
        inputs.push(input);
    }
    for input in &inputs {
        spooler.process(input).unwrap();
    }
    spooler.wait_for_upload().await;

    let results = collect_results(&mut rx, count).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(spooler.num_errors(), 0);
    assert_eq!(spooler.outstanding(), 0);

    // Exactly one result per submitted path.
    let paths: HashSet<_> = results.iter().map(|r| r.local_path.clone()).collect();
    assert_eq!(paths.len(), count);
    for input in &inputs {
        assert!(paths.contains(input));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_subupload_yields_single_failed_result() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        FaultStore::new(Arc::new(MemoryStore::new()))
            .fail_puts(&[1])
            .put_latency(1, 3)
            .seed(11),
    );
    let spooler = spooler_over(&dir, Arc::clone(&store) as Arc<dyn UploadStore>).await;
    let mut rx = spooler.subscribe_channel();

    // Large enough to chunk, so the request fans out into several puts.
    let input = write_file(&dir, "big.bin", &test_data(200 * 1024)).await;
    spooler.process(&input).unwrap();
    spooler.wait_for_upload().await;

    let result = collect_results(&mut rx, 1).await.remove(0);
    assert_eq!(result.return_code, code::UPLOAD_FAILURE);
    assert!(result.content_hash.is_null());
    // Chunk descriptors survive for diagnostics even on failure.
    assert!(result.is_chunked());
    assert_eq!(spooler.num_errors(), 1);

    // One failed put does not abort its siblings: every sub-upload was
    // still attempted (chunks plus the bulk object).
    assert_eq!(
        store.put_count(),
        result.file_chunks.len() as u64 + 1,
        "all sub-uploads must run to completion"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_for_upload_is_a_drain_not_a_shutdown() {
    let dir = TempDir::new().unwrap();
    let (spooler, _store) = memory_spooler(&dir).await;
    let mut rx = spooler.subscribe_channel();

    let first = write_file(&dir, "first.bin", &test_data(5000)).await;
    spooler.process(&first).unwrap();
    spooler.wait_for_upload().await;
    assert_eq!(spooler.outstanding(), 0);

    let second = write_file(&dir, "second.bin", &test_data(6000)).await;
    spooler.process(&second).unwrap();
    spooler.wait_for_upload().await;

    let results = collect_results(&mut rx, 2).await;
    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_results_delivered_before_wait_returns() {
    let dir = TempDir::new().unwrap();
    let (spooler, _store) = memory_spooler(&dir).await;
    let mut rx = spooler.subscribe_channel();

    let count = 10;
    for i in 0..count {
        let input = write_file(&dir, &format!("f{i}.bin"), &test_data(3000 + i)).await;
        spooler.process(&input).unwrap();
    }
    spooler.wait_for_upload().await;

    // All results must already be buffered once the wait returns.
    for _ in 0..count {
        rx.try_recv().expect("result missing after wait_for_upload");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mixed_process_and_upload_requests() {
    let dir = TempDir::new().unwrap();
    let (spooler, store) = memory_spooler(&dir).await;
    let mut rx = spooler.subscribe_channel();

    let chunked = write_file(&dir, "chunked.bin", &test_data(150 * 1024)).await;
    let direct = write_file(&dir, "direct.bin", &test_data(500)).await;
    spooler.process(&chunked).unwrap();
    spooler.upload(&direct, "meta/catalog").unwrap();
    spooler.wait_for_upload().await;

    let results = collect_results(&mut rx, 2).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(store.contains("meta/catalog").await.unwrap());
    assert_eq!(spooler.num_errors(), 0);
}
