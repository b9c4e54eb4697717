//! Error types for backend upload drivers.

/// Errors that can occur in a backend upload driver.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The object name is not acceptable to this driver.
    #[error("invalid object name: {0:?}")]
    InvalidObjectName(String),

    /// The spooler definition does not select a usable driver.
    #[error("invalid spooler definition: {0}")]
    InvalidDefinition(String),

    /// A fault injected by a test wrapper.
    #[error("injected fault on put #{index}")]
    Injected {
        /// Sequence number of the failed put.
        index: u64,
    },
}
