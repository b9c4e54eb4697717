//! Spooling engine tying processing, upload fan-out, and result
//! aggregation together.
//!
//! The [`Spooler`] is the public entry point: it accepts file requests,
//! runs them through the [`FileProcessor`], uploads the resulting
//! artifacts through a pluggable backend driver, and delivers exactly
//! one final result per request via the [`ListenerRegistry`].

pub mod aggregate;
pub mod error;
pub mod listeners;
pub mod processor;
pub mod spooler;

pub use aggregate::{TaskId, TaskTable};
pub use error::EngineError;
pub use listeners::ListenerRegistry;
pub use processor::{FileProcessor, ProcessResult, ProcessedChunk};
pub use spooler::Spooler;

#[cfg(test)]
mod tests;
