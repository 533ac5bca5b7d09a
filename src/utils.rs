//! Low-level read helpers for variable-length structures.
//!
//! Fixed layouts go through [`crate::decode`]. These helpers cover the rest:
//! entry tables and length-prefixed strings walked sequentially through any
//! [`Read`] (a [`crate::file::ByteSource`] included). Each function reads
//! exactly the bytes it promises or returns an error.

use std::fmt::Write as _;
use std::io::Read;

use crate::{Error, Result};

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    Ok(u16::from_be_bytes(bytesa(r)?))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(u32::from_be_bytes(bytesa(r)?))
}

/// Read a big-endian `u64`.
#[inline]
pub(crate) fn be_u64<R: Read>(r: &mut R) -> Result<u64> {
    Ok(u64::from_be_bytes(bytesa(r)?))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::BadMagic`] naming `record` on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(
    r: &mut R,
    expected: &[u8; N],
    record: &'static str,
) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::BadMagic { record });
    }
    Ok(())
}

/// Lowercase hex rendering of `bytes`, no separators.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}
