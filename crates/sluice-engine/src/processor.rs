//! File processing: chunk, compress, hash.
//!
//! The [`FileProcessor`] converts one source file into compressed,
//! content-addressed scratch artifacts: an always-present bulk object
//! and, for large enough files with chunking allowed, a sequence of
//! content-defined chunks. Processing runs under a bounded semaphore so
//! that many files can be submitted at once without unbounded memory
//! use. All failures (unreadable file, compression error, scratch
//! write error) are converted into a non-zero `return_code` on the
//! [`ProcessResult`]; nothing propagates as an `Err` across the
//! asynchronous boundary.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sluice_cas::{compress_and_hash, ChunkBounds, Chunker};
use sluice_types::{code, ContentHash, FileChunk, SpoolerDefinition};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::EngineError;

/// One processed chunk: its descriptor plus the scratch artifact holding
/// the compressed bytes.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    /// Chunk descriptor (offsets in the original file, compressed digest).
    pub chunk: FileChunk,
    /// Scratch file containing the compressed chunk.
    pub artifact: PathBuf,
}

/// Outcome of processing one file.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// The source path that was processed.
    pub local_path: PathBuf,
    /// `code::OK`, or the failure that aborted processing.
    pub return_code: i32,
    /// Digest of the compressed bulk representation; null on failure.
    pub bulk_hash: ContentHash,
    /// Scratch file containing the compressed bulk object.
    pub bulk_artifact: PathBuf,
    /// Chunks produced; empty when the file was not chunked.
    pub chunks: Vec<ProcessedChunk>,
    /// Per-task scratch directory holding all artifacts of this result.
    pub scratch_dir: PathBuf,
}

impl ProcessResult {
    /// Whether processing succeeded.
    pub fn is_ok(&self) -> bool {
        self.return_code == code::OK
    }

    fn failed(local_path: PathBuf, scratch_dir: PathBuf, return_code: i32) -> Self {
        Self {
            local_path,
            return_code,
            bulk_hash: ContentHash::NULL,
            bulk_artifact: PathBuf::new(),
            chunks: Vec::new(),
            scratch_dir,
        }
    }
}

/// Chunks, compresses, and hashes files under bounded concurrency.
pub struct FileProcessor {
    scratch_base: PathBuf,
    /// `Some` when the definition enables chunking.
    chunker: Option<Chunker>,
    min_chunk_size: u64,
    permits: Semaphore,
    // Per-task scratch directories are numbered so two in-flight files
    // can never collide on an artifact path.
    task_counter: AtomicU64,
}

impl FileProcessor {
    /// Build a processor from a valid spooler definition.
    pub fn new(definition: &SpoolerDefinition, max_concurrency: usize) -> Result<Self, EngineError> {
        if !definition.is_valid() {
            return Err(EngineError::InvalidDefinition);
        }

        let chunker = if definition.use_chunking {
            Some(Chunker::new(ChunkBounds::from_definition(definition)?))
        } else {
            None
        };

        Ok(Self {
            scratch_base: definition.temp_dir.clone(),
            chunker,
            min_chunk_size: definition.min_chunk_size,
            permits: Semaphore::new(max_concurrency.max(1)),
            task_counter: AtomicU64::new(0),
        })
    }

    /// Process one file into compressed scratch artifacts.
    ///
    /// Never returns an error: failures are reported through the
    /// result's `return_code` with a null bulk digest.
    pub async fn process(&self, local_path: &Path, allow_chunking: bool) -> ProcessResult {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("processor semaphore closed");

        let task = self.task_counter.fetch_add(1, Ordering::Relaxed);
        let scratch_dir = self.scratch_base.join(format!("task-{task}"));

        match self.run(local_path, allow_chunking, &scratch_dir).await {
            Ok(result) => result,
            Err((return_code, error)) => {
                warn!(
                    path = %local_path.display(),
                    return_code,
                    %error,
                    "file processing failed"
                );
                ProcessResult::failed(local_path.to_path_buf(), scratch_dir, return_code)
            }
        }
    }

    async fn run(
        &self,
        local_path: &Path,
        allow_chunking: bool,
        scratch_dir: &Path,
    ) -> Result<ProcessResult, (i32, std::io::Error)> {
        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| (code::READ_FAILURE, e))?;

        tokio::fs::create_dir_all(scratch_dir)
            .await
            .map_err(|e| (code::SCRATCH_FAILURE, e))?;

        let chunker = match &self.chunker {
            Some(chunker) if allow_chunking && data.len() as u64 >= self.min_chunk_size => {
                Some(chunker)
            }
            _ => None,
        };

        let mut chunks = Vec::new();
        if let Some(chunker) = chunker {
            for (i, raw) in chunker.chunk(&data).iter().enumerate() {
                let slice = &data[raw.offset as usize..(raw.offset + raw.size) as usize];
                let (compressed, hash) = compress_and_hash(slice)
                    .await
                    .map_err(|e| (code::COMPRESSION_FAILURE, e))?;

                let artifact = scratch_dir.join(format!("chunk-{i}"));
                tokio::fs::write(&artifact, &compressed)
                    .await
                    .map_err(|e| (code::SCRATCH_FAILURE, e))?;

                chunks.push(ProcessedChunk {
                    chunk: FileChunk {
                        offset: raw.offset,
                        size: raw.size,
                        content_hash: hash,
                    },
                    artifact,
                });
            }
        }

        // The bulk pass is independent of chunking: the digest of the
        // whole compressed file anchors the result even when chunked.
        let (compressed, bulk_hash) = compress_and_hash(&data)
            .await
            .map_err(|e| (code::COMPRESSION_FAILURE, e))?;
        let bulk_artifact = scratch_dir.join("bulk");
        tokio::fs::write(&bulk_artifact, &compressed)
            .await
            .map_err(|e| (code::SCRATCH_FAILURE, e))?;

        debug!(
            path = %local_path.display(),
            size = data.len(),
            chunks = chunks.len(),
            %bulk_hash,
            "file processed"
        );

        Ok(ProcessResult {
            local_path: local_path.to_path_buf(),
            return_code: code::OK,
            bulk_hash,
            bulk_artifact,
            chunks,
            scratch_dir: scratch_dir.to_path_buf(),
        })
    }
}
