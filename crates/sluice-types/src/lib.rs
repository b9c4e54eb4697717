//! Shared types for the Sluice spooling pipeline.
//!
//! This crate defines the types used across the Sluice workspace:
//! the content digest ([`ContentHash`]), chunk descriptors ([`FileChunk`]),
//! the per-file completion record ([`SpoolerResult`]) with its status
//! [`code`]s, and the parsed backend-selection string
//! ([`SpoolerDefinition`]).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default minimum chunk size (4 MiB).
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Default target-average chunk size (8 MiB).
pub const DEFAULT_AVG_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Default maximum chunk size (16 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Status codes carried by [`SpoolerResult`] and sub-upload completions.
///
/// `0` means success; anything non-zero is a failure. When a result is a
/// failure its content hash is [`ContentHash::NULL`] and must not be used.
pub mod code {
    /// The operation completed successfully.
    pub const OK: i32 = 0;
    /// The source file could not be read.
    pub const READ_FAILURE: i32 = 1;
    /// Compression of a chunk or the bulk file failed.
    pub const COMPRESSION_FAILURE: i32 = 2;
    /// Writing an intermediate artifact to the scratch space failed.
    pub const SCRATCH_FAILURE: i32 = 3;
    /// The backend rejected or failed a sub-upload.
    pub const UPLOAD_FAILURE: i32 = 4;
    /// The spooler was already terminated when the request arrived.
    pub const TERMINATED: i32 = 5;
}

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// A 32-byte BLAKE3 content digest.
///
/// Equality is byte-equality. [`ContentHash::NULL`] is the distinguished
/// all-zero value and is the expected digest whenever an operation failed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// The distinguished null digest (all zero bytes).
    pub const NULL: ContentHash = ContentHash([0u8; 32]);

    /// Hash arbitrary data with BLAKE3.
    pub fn from_data(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    /// Whether this is the null digest.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Backend object path with a 2-level fan-out: `xy/rest-of-hex`.
    ///
    /// Content-addressed objects are stored under this path (prefixed by
    /// a namespace chosen by the caller, e.g. `data/`).
    pub fn object_path(&self) -> String {
        let hex = self.to_string();
        format!("{}/{}", &hex[0..2], &hex[2..])
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

// ---------------------------------------------------------------------------
// Chunk and result types
// ---------------------------------------------------------------------------

/// One contiguous, non-overlapping slice of an original (uncompressed) file.
///
/// An ordered sequence of `FileChunk`s for one file starts at offset 0,
/// is contiguous, and ends at the file's size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunk {
    /// Byte offset of this chunk within the original file.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub size: u64,
    /// Digest of the compressed chunk contents.
    pub content_hash: ContentHash,
}

impl FileChunk {
    /// Exclusive end offset within the original file.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Final per-file completion record delivered to listeners.
///
/// Exactly one `SpoolerResult` is emitted per `process`/`upload` request,
/// no matter how many sub-uploads the request fanned out into. When
/// `return_code` is non-zero the content hash is [`ContentHash::NULL`]
/// and must not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolerResult {
    /// Status of the whole request; `0` on success.
    pub return_code: i32,
    /// The local path originally given as input.
    pub local_path: PathBuf,
    /// Digest of the compressed bulk file derived during processing.
    pub content_hash: ContentHash,
    /// Chunks generated during processing; empty if the file was not chunked.
    pub file_chunks: Vec<FileChunk>,
}

impl SpoolerResult {
    /// Whether the file was split into chunks.
    pub fn is_chunked(&self) -> bool {
        !self.file_chunks.is_empty()
    }

    /// Whether the request succeeded.
    pub fn is_ok(&self) -> bool {
        self.return_code == code::OK
    }
}

// ---------------------------------------------------------------------------
// Spooler definition
// ---------------------------------------------------------------------------

/// The backend driver selected by a spooler definition string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    /// Local-filesystem backend.
    Local,
    /// In-memory key-value backend.
    Memory,
    /// Unrecognized driver token; the definition is not usable.
    Unknown,
}

/// Parsed spooler configuration.
///
/// Built from a definition string of the form
/// `<driver>:<driver-specific-description>`, e.g. `local:/srv/store`.
/// A malformed string or chunk bounds violating `min <= avg <= max`
/// produce a definition for which [`SpoolerDefinition::is_valid`] returns
/// `false`; all operations must reject such a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolerDefinition {
    /// Selected backend driver.
    pub driver: DriverKind,
    /// Driver-specific configuration (interpreted by the concrete store).
    pub driver_config: String,
    /// Scratch space for intermediate compressed artifacts.
    pub temp_dir: PathBuf,
    /// Whether large files may be cut into chunks.
    pub use_chunking: bool,
    /// Minimum chunk size in bytes.
    pub min_chunk_size: u64,
    /// Target-average chunk size in bytes.
    pub avg_chunk_size: u64,
    /// Maximum chunk size in bytes.
    pub max_chunk_size: u64,

    valid: bool,
}

impl SpoolerDefinition {
    /// Parse a definition string with chunking disabled.
    pub fn new(definition: &str, temp_dir: impl AsRef<Path>) -> Self {
        Self::with_chunking(
            definition,
            temp_dir,
            false,
            DEFAULT_MIN_CHUNK_SIZE,
            DEFAULT_AVG_CHUNK_SIZE,
            DEFAULT_MAX_CHUNK_SIZE,
        )
    }

    /// Parse a definition string with explicit chunking configuration.
    pub fn with_chunking(
        definition: &str,
        temp_dir: impl AsRef<Path>,
        use_chunking: bool,
        min_chunk_size: u64,
        avg_chunk_size: u64,
        max_chunk_size: u64,
    ) -> Self {
        let (driver, driver_config) = match definition.split_once(':') {
            Some(("local", rest)) if !rest.is_empty() => (DriverKind::Local, rest.to_string()),
            Some(("mem", rest)) => (DriverKind::Memory, rest.to_string()),
            _ => (DriverKind::Unknown, String::new()),
        };

        let bounds_ok = !use_chunking
            || (min_chunk_size > 0
                && min_chunk_size <= avg_chunk_size
                && avg_chunk_size <= max_chunk_size);

        let valid = driver != DriverKind::Unknown && bounds_ok;

        Self {
            driver,
            driver_config,
            temp_dir: temp_dir.as_ref().to_path_buf(),
            use_chunking,
            min_chunk_size,
            avg_chunk_size,
            max_chunk_size,
            valid,
        }
    }

    /// Whether this definition is usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
