//! Transparent decompression of whole byte sources (requires the
//! `compression` feature).
//!
//! Some dumps are distributed as a single compressed stream (`game.nsf.zst`,
//! `disc.wud.lz4`). [`decompress_source`] sniffs the frame signature and,
//! when it recognizes one, returns a new in-memory source holding the
//! decompressed bytes. [`crate::RomData`] runs it before detection, so
//! format readers only ever see plain data.
//!
//! Output is bounded: a stream that expands past the caller's limit
//! ([`crate::romdata::Options::max_decompressed_size`]) is rejected after
//! at most `limit + 1` bytes have been produced.
//!
//! ```toml
//! [dependencies]
//! romkit = { version = "0.1", features = ["compression"] }
//! ```
//!
//! ## Submodules
//!
//! | Module   | Algorithm       | Frame magic   |
//! |----------|-----------------|---------------|
//! | [`lz4`]  | LZ4 frame       | `04 22 4D 18` |
//! | [`zstd`] | Zstandard frame | `28 B5 2F FD` |

#[cfg(feature = "compression")]
pub mod lz4;

#[cfg(feature = "compression")]
pub mod zstd;

#[cfg(feature = "compression")]
pub use self::source::decompress_source;

/// Default cap on a decompressed source (256 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: u64 = 256 << 20;

/// Drain `r` into memory, failing once more than `limit` bytes come out.
#[cfg(feature = "compression")]
fn read_capped<R: std::io::Read>(
    r: R,
    limit: u64,
    codec_error: impl Fn(std::io::Error) -> crate::Error,
) -> crate::Result<Vec<u8>> {
    use std::io::Read;

    let mut out = Vec::new();
    r.take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(codec_error)?;
    if out.len() as u64 > limit {
        log::debug!("decompressed output exceeds {limit} bytes");
        return Err(crate::Error::Parse("decompressed size exceeds limit"));
    }
    Ok(out)
}

#[cfg(feature = "compression")]
mod source {
    use std::sync::Arc;

    use super::{lz4, zstd};
    use crate::Result;
    use crate::file::{ByteSource, MemBacking};

    /// Expand `src` if it starts with a known compression frame.
    ///
    /// Returns `Ok(None)` for anything else. The returned source is
    /// read-only and inherits `src`'s tracker. Output larger than `limit`
    /// bytes is an [`crate::Error::Parse`].
    pub fn decompress_source(src: &mut ByteSource, limit: u64) -> Result<Option<ByteSource>> {
        let mut sig = [0u8; 4];
        let n = src.read_at(0, &mut sig)?;
        src.seek(0)?;
        if n < sig.len() {
            return Ok(None);
        }

        let result = match sig {
            zstd::FRAME_MAGIC => zstd::decompress_zstd(&mut *src, limit),
            lz4::FRAME_MAGIC => lz4::decompress_lz4_frame(&mut *src, limit),
            _ => return Ok(None),
        };
        src.seek(0)?;
        let data = result?;
        log::debug!("decompressed source to {} bytes", data.len());

        let plain = ByteSource::from_backing(Arc::new(MemBacking::new(data, false)));
        Ok(Some(match src.tracker() {
            Some(t) => plain.tracked(t),
            None => plain,
        }))
    }

}
