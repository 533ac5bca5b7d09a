//! Readers for the built-in formats.
//!
//! Each submodule targets one format and follows the same conventions:
//!
//! * **Declarative detection** - a `DESCRIPTOR` constant carries the
//!   magic, minimum size and extensions. [`crate::registry::Registry`]
//!   decides which format a file is; a reader never re-checks.
//! * **Header at open, fields on demand** - the descriptor's `open`
//!   decodes the mandatory header (a failure there makes the file invalid)
//!   and returns a [`crate::romdata::FormatReader`]. Fields and metadata
//!   are built later, the first time they are asked for.
//! * **Optional records degrade** - nested records that fail to decode are
//!   skipped and reported; the rest of the file still loads.
//! * **Fixed layouts are schemas** - headers are `static`
//!   [`crate::decode::Schema`] values; only variable-length tables are
//!   walked by hand.
//!
//! ## Format overview
//!
//! Listed in registration order, which decides ties during detection.
//!
//! | Module    | Format | Byte order | Description |
//! |-----------|--------|------------|-------------|
//! | [`nsf`]   | NSF    | LE | NES Sound Format music rip |
//! | [`xdbf`]  | XDBF   | BE | Xbox 360 resource database (SPA, GPD) |
//! | [`nasos`] | NASOS  | LE | Compressed GameCube/Wii disc image (`.iso.dec`) |
//! | [`wiiu`]  | Wii U  | BE | Wii U disc image |

use crate::registry::FormatDescriptor;

pub mod nasos;
pub mod nsf;
pub mod wiiu;
pub mod xdbf;

/// Every built-in descriptor, in registration order.
pub const BUILTIN: &[FormatDescriptor] = &[
    nsf::DESCRIPTOR,
    xdbf::DESCRIPTOR,
    nasos::DESCRIPTOR,
    wiiu::DESCRIPTOR,
];
