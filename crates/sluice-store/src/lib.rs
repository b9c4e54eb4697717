//! Backend upload drivers for the Sluice pipeline.
//!
//! This crate defines the [`UploadStore`] trait, the contract between
//! the spooler and whatever physically persists objects, along with the
//! concrete drivers:
//!
//! - [`LocalStore`]: one file per object under a base directory, with
//!   atomic temp-file-and-rename writes.
//! - [`MemoryStore`]: in-memory storage backed by a `RwLock<HashMap>`.
//! - [`FaultStore`]: failure/latency-injecting wrapper for tests.
//!
//! [`create_store`] selects and initializes a driver from a parsed
//! `SpoolerDefinition`.

mod error;
mod factory;
mod fault_store;
mod local_store;
mod memory_store;
mod traits;

pub use error::StoreError;
pub use factory::create_store;
pub use fault_store::FaultStore;
pub use local_store::LocalStore;
pub use memory_store::MemoryStore;
pub use traits::UploadStore;
