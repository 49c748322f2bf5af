//! Shard payload decoding: optional xz framing around a MessagePack array.

use log::warn;
use std::io::Read;

use super::rainbow::{as_rainbow_table, expand_row};
use super::Row;
use crate::error::{LinkError, Result};

const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Check if data is xz compressed (magic bytes check)
#[inline]
pub fn is_xz(data: &[u8]) -> bool {
    data.starts_with(&XZ_MAGIC)
}

pub fn decompress_xz(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    xz2::read::XzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| LinkError::DecodeError(format!("xz decompression failed: {}", e)))?;
    Ok(out)
}

/// Decode one shard into rows.
///
/// xz input is decompressed first. When the array's first element is a list
/// of strings it is taken as the shard's string table and every following
/// row's pricing is expanded from it. Rows whose pricing does not expand are
/// kept unexpanded.
pub fn decode_shard(data: &[u8]) -> Result<Vec<Row>> {
    let decompressed;
    let bytes = if is_xz(data) {
        decompressed = decompress_xz(data)?;
        decompressed.as_slice()
    } else {
        data
    };

    let mut items: Vec<Row> = rmp_serde::from_slice(bytes)
        .map_err(|e| LinkError::DecodeError(format!("invalid shard payload: {}", e)))?;

    let Some(table) = items.first().and_then(as_rainbow_table) else {
        return Ok(items);
    };
    items.remove(0);
    for (i, row) in items.iter_mut().enumerate() {
        if let Err(e) = expand_row(&table, row) {
            warn!("[PIPELINE] Row {} keeps indexed pricing: {}", i, e);
        }
    }
    Ok(items)
}
