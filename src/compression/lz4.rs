//! LZ4 frame decompression (requires the `compression` feature).
//!
//! Expects the standard LZ4 frame format (as written by the `lz4` command
//! line tool), not the raw block format.

#![cfg(feature = "compression")]

use std::io::Read;

use crate::{Error, Result};

/// Signature at the start of every LZ4 frame.
pub const FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

/// Decompress a complete LZ4 frame stream of at most `limit` bytes.
///
/// Returns [`Error::Lz4`] on any decompression failure and
/// [`Error::Parse`] once the output would pass `limit`.
pub fn decompress_lz4_frame<R: Read>(r: R, limit: u64) -> Result<Vec<u8>> {
    super::read_capped(lz4_flex::frame::FrameDecoder::new(r), limit, |e| {
        log::debug!("lz4: {e}");
        Error::Lz4
    })
}
