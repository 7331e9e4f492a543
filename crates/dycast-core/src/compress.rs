//! Gzip helpers for push frame payloads.
//!
//! The push server gzips the `Response` carried by a frame when the frame
//! headers declare `compress_type=gzip`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{DyCastError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound for one inflated `Response`.
pub const MAX_INFLATED_BYTES: usize = 16 * 1024 * 1024;

/// Gzip member header present. A protobuf `Response` can never start with
/// these bytes (field 3, wire type 7 does not exist).
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Inflate a gzip member, refusing output above `MAX_INFLATED_BYTES`.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    inflate_limited(data, MAX_INFLATED_BYTES)
}

pub fn inflate_limited(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
    GzDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| DyCastError::Decompress(e.to_string()))?;
    if out.len() > limit {
        return Err(DyCastError::Decompress(format!(
            "inflated payload exceeds {limit} bytes"
        )));
    }
    Ok(out)
}

/// Gzip `data` with the default level.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}
