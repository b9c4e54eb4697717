//! The spooler: asynchronous façade over processing and upload.
//!
//! A [`Spooler`] accepts file requests, fans each one out into
//! compressed content-addressed sub-uploads, and reports one final
//! [`SpoolerResult`] per request through the listener registry. Requests
//! return immediately after registration; all heavy lifting happens on
//! spawned tasks. `wait_for_upload` blocks until the backlog drains,
//! `wait_for_termination` additionally shuts the spooler down for good.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use sluice_store::{create_store, UploadStore};
use sluice_types::{code, SpoolerDefinition, SpoolerResult};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::{TaskId, TaskTable};
use crate::error::EngineError;
use crate::listeners::ListenerRegistry;
use crate::processor::{FileProcessor, ProcessResult};

/// Upper bound on files processed concurrently.
const MAX_CONCURRENT_PROCESSING: usize = 8;

struct Inner {
    store: Arc<dyn UploadStore>,
    processor: FileProcessor,
    tasks: TaskTable,
    listeners: ListenerRegistry,
    error_count: AtomicU64,
}

impl Inner {
    /// Deliver a final result, counting failures.
    fn emit(&self, result: SpoolerResult) {
        if !result.is_ok() {
            self.error_count.fetch_add(1, Ordering::SeqCst);
            warn!(
                path = %result.local_path.display(),
                return_code = result.return_code,
                "spooler request failed"
            );
        } else {
            debug!(
                path = %result.local_path.display(),
                chunks = result.file_chunks.len(),
                "spooler request finished"
            );
        }
        self.listeners.notify(&result);
        // Release the in-flight slot only after listeners saw the
        // result, so wait_for_upload never races a pending delivery.
        self.tasks.settle();
    }

    /// Read a scratch artifact and push it to the backend.
    ///
    /// Returns a status code; the artifact is removed on success.
    async fn upload_artifact(&self, object: &str, artifact: &Path) -> i32 {
        let data = match tokio::fs::read(artifact).await {
            Ok(data) => data,
            Err(error) => {
                warn!(%object, %error, "failed to read scratch artifact");
                return code::SCRATCH_FAILURE;
            }
        };

        match self.store.put(object, Bytes::from(data)).await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(artifact).await;
                code::OK
            }
            Err(error) => {
                warn!(%object, %error, "upload failed");
                code::UPLOAD_FAILURE
            }
        }
    }

    /// Drive one processed file through its sub-uploads.
    async fn dispatch(self: Arc<Self>, id: TaskId, outcome: ProcessResult) {
        // Identical chunks within one file, and objects the backend
        // already holds, need no upload. Deduplication is by object
        // name; the artifact of a skipped entry is dropped right away.
        let mut jobs: Vec<(String, PathBuf)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut candidates: Vec<(String, PathBuf)> = Vec::with_capacity(outcome.chunks.len() + 1);
        candidates.push((
            format!("data/{}", outcome.bulk_hash.object_path()),
            outcome.bulk_artifact.clone(),
        ));
        for pc in &outcome.chunks {
            candidates.push((
                format!("data/{}", pc.chunk.content_hash.object_path()),
                pc.artifact.clone(),
            ));
        }

        for (object, artifact) in candidates {
            if !seen.insert(object.clone()) {
                let _ = tokio::fs::remove_file(&artifact).await;
                continue;
            }
            // A failed existence check counts as "unknown": uploading an
            // object that may already exist is safe, skipping one that
            // does not is not.
            match self.store.contains(&object).await {
                Ok(true) => {
                    debug!(%object, "object already present, skipping upload");
                    let _ = tokio::fs::remove_file(&artifact).await;
                }
                Ok(false) | Err(_) => jobs.push((object, artifact)),
            }
        }

        let file_chunks = outcome.chunks.iter().map(|pc| pc.chunk.clone()).collect();
        if let Some(result) = self
            .tasks
            .arm(id, jobs.len() as u32, outcome.bulk_hash, file_chunks)
        {
            // Nothing left to upload.
            let _ = tokio::fs::remove_dir_all(&outcome.scratch_dir).await;
            self.emit(result);
            return;
        }

        for (object, artifact) in jobs {
            let inner = Arc::clone(&self);
            let scratch_dir = outcome.scratch_dir.clone();
            tokio::spawn(async move {
                let status = inner.upload_artifact(&object, &artifact).await;
                if let Some(result) = inner.tasks.complete(id, status) {
                    if result.is_ok() {
                        let _ = tokio::fs::remove_dir_all(&scratch_dir).await;
                    }
                    inner.emit(result);
                }
            });
        }
    }
}

/// Asynchronous upload spooler.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct Spooler {
    definition: SpoolerDefinition,
    inner: Arc<Inner>,
    accepting: AtomicBool,
}

impl Spooler {
    /// Build a spooler from a definition, constructing the backend
    /// driver it names.
    pub async fn new(definition: SpoolerDefinition) -> Result<Self, EngineError> {
        if !definition.is_valid() {
            return Err(EngineError::InvalidDefinition);
        }
        let store = create_store(&definition).await?;
        Self::assemble(definition, store).await
    }

    /// Build a spooler around an externally constructed driver.
    pub async fn with_store(
        definition: SpoolerDefinition,
        store: Arc<dyn UploadStore>,
    ) -> Result<Self, EngineError> {
        if !definition.is_valid() {
            return Err(EngineError::InvalidDefinition);
        }
        store.init().await?;
        Self::assemble(definition, store).await
    }

    async fn assemble(
        definition: SpoolerDefinition,
        store: Arc<dyn UploadStore>,
    ) -> Result<Self, EngineError> {
        tokio::fs::create_dir_all(&definition.temp_dir).await?;
        let processor = FileProcessor::new(&definition, MAX_CONCURRENT_PROCESSING)?;
        info!(
            driver = store.name(),
            scratch = %definition.temp_dir.display(),
            chunking = definition.use_chunking,
            "spooler ready"
        );

        Ok(Self {
            definition,
            inner: Arc::new(Inner {
                store,
                processor,
                tasks: TaskTable::new(),
                listeners: ListenerRegistry::new(),
                error_count: AtomicU64::new(0),
            }),
            accepting: AtomicBool::new(true),
        })
    }

    /// The definition this spooler was built from.
    pub fn definition(&self) -> &SpoolerDefinition {
        &self.definition
    }

    /// Register a callback for every final result.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&SpoolerResult) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener);
    }

    /// Register a channel listener and return its receiving end.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<SpoolerResult> {
        self.inner.listeners.subscribe_channel()
    }

    /// Schedule a file for chunked, content-addressed ingestion.
    ///
    /// Returns as soon as the request is registered; the final result
    /// arrives through the listeners.
    pub fn process(&self, local_path: &Path) -> Result<(), EngineError> {
        self.process_with(local_path, true)
    }

    /// Like [`process`](Self::process), but with chunking forced off
    /// for this one file regardless of the definition.
    pub fn process_with(
        &self,
        local_path: &Path,
        allow_chunking: bool,
    ) -> Result<(), EngineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EngineError::Terminated);
        }

        let id = self.inner.tasks.begin(local_path);
        let inner = Arc::clone(&self.inner);
        let path = local_path.to_path_buf();
        tokio::spawn(async move {
            let outcome = inner.processor.process(&path, allow_chunking).await;
            if !outcome.is_ok() {
                let result = inner.tasks.fail(id, outcome.return_code);
                inner.emit(result);
                return;
            }
            inner.dispatch(id, outcome).await;
        });
        Ok(())
    }

    /// Schedule a verbatim upload of a local file to an explicit
    /// destination name, bypassing chunking and content addressing.
    pub fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), EngineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EngineError::Terminated);
        }

        let id = self.inner.tasks.begin(local_path);
        // One sub-upload, no digest, no chunks.
        let armed = self
            .inner
            .tasks
            .arm(id, 1, sluice_types::ContentHash::NULL, Vec::new());
        debug_assert!(armed.is_none());

        let inner = Arc::clone(&self.inner);
        let path = local_path.to_path_buf();
        let remote = remote_name.to_string();
        tokio::spawn(async move {
            let status = match tokio::fs::read(&path).await {
                Ok(data) => match inner.store.put(&remote, Bytes::from(data)).await {
                    Ok(()) => code::OK,
                    Err(error) => {
                        warn!(object = %remote, %error, "direct upload failed");
                        code::UPLOAD_FAILURE
                    }
                },
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to read upload source");
                    code::READ_FAILURE
                }
            };
            if let Some(result) = inner.tasks.complete(id, status) {
                inner.emit(result);
            }
        });
        Ok(())
    }

    /// Block until every registered request has produced its result.
    ///
    /// New requests may be scheduled afterwards; this is a drain, not a
    /// shutdown.
    pub async fn wait_for_upload(&self) {
        self.inner.tasks.wait_idle().await;
    }

    /// Drain the backlog, then shut the spooler down.
    ///
    /// After this returns, `process` and `upload` are rejected with
    /// [`EngineError::Terminated`].
    pub async fn wait_for_termination(&self) -> Result<(), EngineError> {
        self.accepting.store(false, Ordering::SeqCst);
        self.inner.tasks.wait_idle().await;
        self.inner.store.teardown().await?;
        info!(errors = self.num_errors(), "spooler terminated");
        Ok(())
    }

    /// Number of requests that finished with a failure so far.
    pub fn num_errors(&self) -> u64 {
        self.inner.error_count.load(Ordering::SeqCst)
    }

    /// Number of requests currently in flight.
    pub fn outstanding(&self) -> usize {
        self.inner.tasks.outstanding()
    }
}
