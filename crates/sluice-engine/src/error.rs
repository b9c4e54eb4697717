//! Error types for the spooling engine.

/// Errors that can occur when constructing or driving a spooler.
///
/// Per-file failures are never surfaced through this type; they are
/// converted into status codes carried by the emitted `SpoolerResult`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The spooler definition is malformed or selects an unknown driver.
    #[error("invalid spooler definition")]
    InvalidDefinition,

    /// The backend upload driver failed.
    #[error("store error: {0}")]
    Store(#[from] sluice_store::StoreError),

    /// Chunking or compression setup failed.
    #[error("cas error: {0}")]
    Cas(#[from] sluice_cas::CasError),

    /// An I/O error occurred outside of per-file processing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The spooler was terminated; no further requests are accepted.
    #[error("spooler already terminated")]
    Terminated,
}
