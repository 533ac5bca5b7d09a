//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout romkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// "File not recognized" is not an error: detection returns [`None`] and a
/// [`crate::RomData`] for an unknown file is still a valid container.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes were available than a structure requires.
    #[error("truncated read at {offset:#x}: needed {needed} bytes, got {available}")]
    Truncated {
        offset: u64,
        needed: usize,
        available: usize,
    },
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value in {record}")]
    BadMagic { record: &'static str },
    /// A format version is present in the data but not supported.
    #[error("unsupported version: {0:#x}")]
    UnsupportedVersion(u32),
    /// An offset or size field would read outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// A seek or read fell outside a sub-range window.
    #[error("position outside of sub-range window")]
    OutOfWindow,
    /// The operation needs a writable byte source.
    #[error("byte source is read-only")]
    ReadOnly,
    /// An optional nested record failed to decode; the field was omitted.
    #[error("{record} sub-record is invalid: {source}")]
    SubRecordInvalid {
        record: &'static str,
        #[source]
        source: Box<Error>,
    },
    /// The mandatory header of a recognized format failed to decode.
    #[error("{format} header is invalid: {source}")]
    TopLevelInvalid {
        format: &'static str,
        #[source]
        source: Box<Error>,
    },
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// LZ4 decompression failed.
    #[cfg(feature = "compression")]
    #[error("lz4 decompression failed")]
    Lz4,
    /// Zstandard decompression failed.
    #[cfg(feature = "compression")]
    #[error("zstd decompression failed")]
    Zstd,
}

impl Error {
    /// Wrap `self` as the cause of an optional sub-record failure.
    pub fn into_sub_record(self, record: &'static str) -> Self {
        Error::SubRecordInvalid {
            record,
            source: Box::new(self),
        }
    }

    /// Wrap `self` as the cause of a top-level header failure.
    pub fn into_top_level(self, format: &'static str) -> Self {
        match self {
            e @ Error::TopLevelInvalid { .. } => e,
            e => Error::TopLevelInvalid {
                format,
                source: Box::new(e),
            },
        }
    }

    /// The innermost cause, looking through sub-record/top-level wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::SubRecordInvalid { source, .. } | Error::TopLevelInvalid { source, .. } => {
                source.root_cause()
            }
            e => e,
        }
    }

    /// Whether the root cause is a short read.
    pub fn is_truncation(&self) -> bool {
        match self.root_cause() {
            Error::Truncated { .. } => true,
            Error::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }

    /// Whether the root cause is a signature mismatch.
    pub fn is_bad_magic(&self) -> bool {
        matches!(self.root_cause(), Error::BadMagic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_wrapping_is_not_nested() {
        let e = Error::BadMagic { record: "NSF" }
            .into_top_level("NSF")
            .into_top_level("NSF");
        match &e {
            Error::TopLevelInvalid { source, .. } => {
                assert!(matches!(**source, Error::BadMagic { .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(e.is_bad_magic());
    }

    #[test]
    fn truncation_is_seen_through_wrappers() {
        let e = Error::Truncated {
            offset: 0,
            needed: 128,
            available: 64,
        }
        .into_sub_record("XSTR");
        assert!(e.is_truncation());
        assert!(!e.is_bad_magic());

        let eof = Error::Io(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(eof.is_truncation());
    }
}
