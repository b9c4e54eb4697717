//! Content-defined cut-point detection.
//!
//! Splits a byte stream into variable-length chunks at boundaries chosen
//! by the rolling checksum, so that inserting or deleting bytes in one
//! region of a file only perturbs nearby boundaries. Unchanged regions of
//! a new file version keep their chunk digests, which is what makes the
//! scheme deduplication-friendly across snapshots.
//!
//! A boundary is accepted once the rolling value, masked by a power of
//! two derived from the target-average size, matches the all-ones
//! pattern, clamped so that no chunk is shorter than `min` (except the
//! final chunk of the file) or longer than `max` (a forced cut).

use sluice_types::SpoolerDefinition;

use crate::error::CasError;
use crate::rolling::RollingHash;

/// Validated `(min, avg, max)` chunk-size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    /// Minimum chunk size in bytes.
    pub min: u64,
    /// Target-average chunk size in bytes.
    pub avg: u64,
    /// Maximum chunk size in bytes.
    pub max: u64,
}

impl ChunkBounds {
    /// Validate and construct chunk bounds.
    ///
    /// Requires `0 < min <= avg <= max`.
    pub fn new(min: u64, avg: u64, max: u64) -> Result<Self, CasError> {
        if min == 0 || min > avg || avg > max {
            return Err(CasError::InvalidBounds { min, avg, max });
        }
        Ok(Self { min, avg, max })
    }

    /// Take the bounds carried by a spooler definition.
    pub fn from_definition(definition: &SpoolerDefinition) -> Result<Self, CasError> {
        Self::new(
            definition.min_chunk_size,
            definition.avg_chunk_size,
            definition.max_chunk_size,
        )
    }
}

/// One contiguous slice of the input, by offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk {
    /// Byte offset within the input.
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
}

/// Content-defined chunker over validated bounds.
///
/// Boundary decisions depend only on the rolling checksum of recent
/// bytes and the distance to the previous cut, never on absolute file
/// offsets. Chunking the same bytes always yields the same boundaries.
pub struct Chunker {
    bounds: ChunkBounds,
    mask: u64,
}

impl Chunker {
    /// Create a chunker for the given bounds.
    pub fn new(bounds: ChunkBounds) -> Self {
        // Power-of-two modulus derived from the average target size:
        // a masked match fires with probability ~1/next_pow2(avg).
        let mask = bounds.avg.next_power_of_two() - 1;
        Self { bounds, mask }
    }

    /// Bounds this chunker was configured with.
    pub fn bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// Compute the cut points of `data`.
    ///
    /// Returns the exclusive end offset of every chunk; the last entry is
    /// always `data.len()`. Empty input yields no cut points.
    pub fn cut_points(&self, data: &[u8]) -> Vec<u64> {
        let mut cuts = Vec::new();
        if data.is_empty() {
            return cuts;
        }

        let min = self.bounds.min as usize;
        let max = self.bounds.max as usize;

        let mut hasher = RollingHash::new();
        let mut last_cut = 0usize;

        for (i, &byte) in data.iter().enumerate() {
            let hash = hasher.push(byte);
            let len = i + 1 - last_cut;

            let content_cut = len >= min && hash & self.mask == self.mask;
            if content_cut || len >= max {
                cuts.push((i + 1) as u64);
                last_cut = i + 1;
            }
        }

        if last_cut < data.len() {
            // Final chunk; may be shorter than the minimum.
            cuts.push(data.len() as u64);
        }

        cuts
    }

    /// Split `data` into content-defined chunks.
    ///
    /// The returned sequence is contiguous, non-overlapping, starts at
    /// offset 0, and covers the whole input. Empty input yields no chunks.
    pub fn chunk(&self, data: &[u8]) -> Vec<RawChunk> {
        let cuts = self.cut_points(data);
        let mut chunks = Vec::with_capacity(cuts.len());
        let mut offset = 0u64;
        for end in cuts {
            chunks.push(RawChunk {
                offset,
                size: end - offset,
            });
            offset = end;
        }
        chunks
    }
}
