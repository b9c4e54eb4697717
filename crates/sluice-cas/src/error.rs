//! Error types for chunking and compression.

/// Errors that can occur while processing file content.
#[derive(Debug, thiserror::Error)]
pub enum CasError {
    /// An I/O error occurred while reading source data or writing artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured chunk bounds are unusable.
    #[error("invalid chunk bounds: min={min}, avg={avg}, max={max}")]
    InvalidBounds {
        /// Minimum chunk size.
        min: u64,
        /// Target-average chunk size.
        avg: u64,
        /// Maximum chunk size.
        max: u64,
    },
}
