//! **romkit** - format-agnostic metadata extraction for game ROMs, disc
//! images and media containers.
//!
//! Hand a [`RomData`] a [`ByteSource`]; it detects the format, decodes the
//! mandatory header and, on first request, produces a typed [`FieldModel`]
//! for display plus a smaller [`fields::MetaData`] set for indexing.
//!
//! ```rust
//! use romkit::{ByteSource, RomData};
//!
//! let mut nsf = vec![0u8; 0x80];
//! nsf[..6].copy_from_slice(b"NESM\x1A\x01");
//! nsf[0x0E..0x13].copy_from_slice(b"Intro");
//!
//! let rom = RomData::new(ByteSource::from_vec(nsf), Some("intro.nsf"));
//! assert!(rom.is_valid());
//! assert_eq!(rom.format_name(), Some("NSF"));
//! assert_eq!(rom.fields().find("Title").and_then(|f| f.as_str()), Some("Intro"));
//! ```
//!
//! # Layers
//! | Module | Role |
//! |--------|------|
//! | [`file`]     | Shared, seekable byte sources with sub-range views |
//! | [`text`]     | Legacy 8-bit and UTF-16 text decoding |
//! | [`decode`]   | Declarative fixed-layout struct decoding |
//! | [`fields`]   | Typed presentation fields and metadata |
//! | [`registry`] | Format descriptors and detection |
//! | [`romdata`]  | The per-file engine tying it together |
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::nsf`]   | NSF - NES Sound Format |
//! | [`formats::xdbf`]  | XDBF - Xbox 360 resource database (SPA/GPD) |
//! | [`formats::nasos`] | NASOS - compressed GameCube/Wii disc image |
//! | [`formats::wiiu`]  | Wii U disc image |
//!
//! # Features
//! * `compression` - transparently expand Zstandard and LZ4 frame
//!   compressed sources before detection. See [`compression`].

pub mod compression;
pub mod decode;
pub mod error;
pub mod fields;
pub mod file;
pub mod formats;
pub mod registry;
pub mod romdata;
pub mod text;
pub mod time;
pub(crate) mod utils;

pub use error::{Error, Result};
pub use fields::FieldModel;
pub use file::ByteSource;
pub use registry::Registry;
pub use romdata::RomData;
