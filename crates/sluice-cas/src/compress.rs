//! Compression and digest helpers.
//!
//! Every stored object, chunk or bulk, is zstd-compressed, and its
//! content hash is computed over the *compressed* bytes, since those are
//! what the backend actually persists.

use async_compression::tokio::write::{ZstdDecoder, ZstdEncoder};
use sluice_types::ContentHash;
use tokio::io::AsyncWriteExt;

/// Compress data with zstd at the default level.
pub async fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut encoder = ZstdEncoder::with_quality(&mut output, async_compression::Level::Default);
    encoder.write_all(data).await?;
    encoder.shutdown().await?;
    Ok(output)
}

/// Decompress zstd-compressed data.
pub async fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut decoder = ZstdDecoder::new(&mut output);
    decoder.write_all(data).await?;
    decoder.shutdown().await?;
    Ok(output)
}

/// Compress data and hash the compressed representation.
pub async fn compress_and_hash(data: &[u8]) -> std::io::Result<(Vec<u8>, ContentHash)> {
    let compressed = compress(data).await?;
    let hash = ContentHash::from_data(&compressed);
    Ok((compressed, hash))
}
