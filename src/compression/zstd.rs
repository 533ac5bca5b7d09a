//! Zstandard decompression (requires the `compression` feature).
//!
//! A whole file compressed as one Zstd stream, typically with a `.zst`
//! suffix. The stream is read through any [`Read`], so a
//! [`crate::file::ByteSource`] can be passed directly.

#![cfg(feature = "compression")]

use std::io::Read;

use crate::{Error, Result};

/// Signature at the start of every Zstandard frame.
pub const FRAME_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

fn zstd_error(e: std::io::Error) -> Error {
    log::debug!("zstd: {e}");
    Error::Zstd
}

/// Decompress a complete Zstandard stream of at most `limit` bytes.
///
/// Returns [`Error::Zstd`] on any decompression failure and
/// [`Error::Parse`] once the output would pass `limit`.
pub fn decompress_zstd<R: Read>(r: R, limit: u64) -> Result<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::new(r).map_err(zstd_error)?;
    super::read_capped(decoder, limit, zstd_error)
}
