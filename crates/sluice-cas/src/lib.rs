//! Content-defined chunking, compression, and hashing.
//!
//! This crate provides the processing primitives of the Sluice pipeline:
//! - [`Chunker`]: content-defined cut-point detection over a rolling
//!   checksum, honoring `(min, avg, max)` [`ChunkBounds`].
//! - [`compress`] / [`compress_and_hash`]: zstd compression with digests
//!   computed over the compressed representation.
//!
//! The decision of *what* to chunk and where results go lives in
//! `sluice-engine`; this crate is purely content in, boundaries and
//! compressed bytes out.

mod chunker;
mod compress;
mod error;
mod rolling;

pub use chunker::{ChunkBounds, Chunker, RawChunk};
pub use compress::{compress, compress_and_hash, decompress};
pub use error::CasError;
pub use rolling::{RollingHash, WINDOW_SIZE};
