//! NASOS - compressed GameCube/Wii disc image (`.iso.dec`).
//!
//! Produced by the NASOS dumping tool. Only the header is understood; the
//! block data that follows is not decoded here.
//!
//! ## GameCube header (0x18 bytes)
//! ```text
//! [0x00] Magic "GCML" / "GCMM"    (4 bytes)
//! [0x04] Game ID (ID4)            (4 bytes ASCII)
//! [0x08] MD5 of original image    (16 bytes)
//! ```
//!
//! ## Wii header (0x5C bytes)
//! ```text
//! [0x00] Magic "WII5" / "WII9"    (4 bytes; single/dual layer)
//! [0x04] Game ID (ID4)            (4 bytes ASCII)
//! [0x08] MD5 of original image    (16 bytes)
//! [0x18] Unknown                  (48 bytes)
//! [0x48] BlockCount × 256         (u32 LE)
//! [0x4C] Unknown                  (16 bytes)
//! ```
//!
//! ## Notes
//! * GameCube images always hold 712,880 blocks of 0x800 bytes. Wii images
//!   use 0x400-byte blocks and record the count.
//! * The magic is compared as raw bytes; every other field is little-endian.

use crate::decode::{ByteOrder, DecodedRecord, FieldSpec, Kind, Magic, Schema, decode};
use crate::fields::{Base, Property, StringFlags};
use crate::file::ByteSource;
use crate::registry::{DetectInfo, FileType, FormatDescriptor};
use crate::romdata::{FormatReader, LoadContext};
use crate::text::Legacy8Bit;
use crate::utils::hex_string;
use crate::{Error, Result};

const GCML: Magic = Magic::new(0, b"GCML");
const GCMM: Magic = Magic::new(0, b"GCMM");
const WII5: Magic = Magic::new(0, b"WII5");
const WII9: Magic = Magic::new(0, b"WII9");

const GCN_BLOCK_COUNT: u32 = 712_880;
const GCN_BLOCK_SIZE: u64 = 0x800;
const WII_BLOCK_SIZE: u64 = 0x400;

pub static GCN_HEADER: Schema = Schema {
    name: "NASOS header",
    size: 0x18,
    byte_order: ByteOrder::Little,
    magic: None,
    fields: &[
        FieldSpec::new("magic", 0x00, Kind::Bytes(4)),
        FieldSpec::new("id4", 0x04, Kind::Text(4, Legacy8Bit::Ascii)),
        FieldSpec::new("md5", 0x08, Kind::Bytes(16)),
    ],
};

pub static WII_HEADER: Schema = Schema {
    name: "NASOS Wii header",
    size: 0x5C,
    byte_order: ByteOrder::Little,
    magic: None,
    fields: &[
        FieldSpec::new("magic", 0x00, Kind::Bytes(4)),
        FieldSpec::new("id4", 0x04, Kind::Text(4, Legacy8Bit::Ascii)),
        FieldSpec::new("md5", 0x08, Kind::Bytes(16)),
        FieldSpec::new("block_count", 0x48, Kind::U32),
    ],
};

pub const DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "NASOS",
    system: "Nintendo GameCube / Wii",
    file_type: FileType::DiscImage,
    byte_order: ByteOrder::Little,
    magic: &[GCML, GCMM, WII5, WII9],
    min_size: 0x18,
    extensions: &[".dec"],
    magic_authoritative: true,
    verify: None,
    open,
};

/// Which console and layer count a NASOS image is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscType {
    GameCube,
    /// `GCMM`; layout identical to `GCML`.
    GameCubeAlt,
    WiiSingleLayer,
    WiiDualLayer,
}

impl DiscType {
    fn from_magic(m: &[u8]) -> Option<Self> {
        match m {
            b"GCML" => Some(Self::GameCube),
            b"GCMM" => Some(Self::GameCubeAlt),
            b"WII5" => Some(Self::WiiSingleLayer),
            b"WII9" => Some(Self::WiiDualLayer),
            _ => None,
        }
    }

    pub fn is_wii(self) -> bool {
        matches!(self, Self::WiiSingleLayer | Self::WiiDualLayer)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GameCube => "GameCube",
            Self::GameCubeAlt => "GameCube (GCMM)",
            Self::WiiSingleLayer => "Wii (single-layer)",
            Self::WiiDualLayer => "Wii (dual-layer)",
        }
    }
}

/// Decoded NASOS header.
#[derive(Debug)]
pub struct Nasos {
    pub disc_type: DiscType,
    header: DecodedRecord,
}

impl Nasos {
    pub fn parse(src: &mut ByteSource) -> Result<Self> {
        let mut magic = [0u8; 4];
        src.read_exact_at(0, &mut magic)?;
        let disc_type = DiscType::from_magic(&magic).ok_or(Error::BadMagic {
            record: GCN_HEADER.name,
        })?;
        let schema = if disc_type.is_wii() { &WII_HEADER } else { &GCN_HEADER };
        let header = decode(src, 0, schema)?;
        Ok(Self { disc_type, header })
    }

    /// Blocks in the original image.
    pub fn block_count(&self) -> Result<u32> {
        if self.disc_type.is_wii() {
            Ok(self.header.u32("block_count")? / 256)
        } else {
            Ok(GCN_BLOCK_COUNT)
        }
    }

    /// Size of the original image in bytes.
    pub fn original_size(&self) -> Result<u64> {
        let block = if self.disc_type.is_wii() { WII_BLOCK_SIZE } else { GCN_BLOCK_SIZE };
        Ok(self.block_count()? as u64 * block)
    }
}

fn open(src: &mut ByteSource, _info: &DetectInfo<'_>) -> Result<Box<dyn FormatReader>> {
    Ok(Box::new(Nasos::parse(src)?))
}

impl FormatReader for Nasos {
    fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
        let id4 = self.header.str("id4")?;
        let md5 = hex_string(self.header.bytes("md5")?);

        let f = &mut ctx.fields;
        f.add_string("Disc Type", self.disc_type.name());
        f.add_string_flags("Game ID", id4, StringFlags::MONOSPACE);
        f.add_string_flags("Original MD5", md5, StringFlags::MONOSPACE);
        f.add_unsigned("Block Count", self.block_count()?.into(), Base::Dec, 0);
        f.add_unsigned("Original Size", self.original_size()?, Base::Dec, 0);

        ctx.metadata.add_string(Property::GameId, id4);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(magic: &[u8; 4], block_count_raw: u32) -> Vec<u8> {
        let mut b = vec![0u8; 0x5C];
        b[..4].copy_from_slice(magic);
        b[4..8].copy_from_slice(b"GALE");
        for (i, x) in b[8..0x18].iter_mut().enumerate() {
            *x = i as u8;
        }
        b[0x48..0x4C].copy_from_slice(&block_count_raw.to_le_bytes());
        b
    }

    #[test]
    fn gamecube_uses_fixed_block_count() {
        let mut src = ByteSource::from_vec(image(b"GCML", 0)[..0x18].to_vec());
        let n = Nasos::parse(&mut src).unwrap();
        assert_eq!(n.disc_type, DiscType::GameCube);
        assert_eq!(n.block_count().unwrap(), 712_880);
        assert_eq!(n.original_size().unwrap(), 1_459_978_240);

        let mut ctx = LoadContext::new(&mut src, "NASOS");
        n.load(&mut ctx).unwrap();
        assert_eq!(ctx.fields.find("Game ID").and_then(|f| f.as_str()), Some("GALE"));
        assert_eq!(
            ctx.fields.find("Original MD5").and_then(|f| f.as_str()),
            Some("000102030405060708090a0b0c0d0e0f")
        );
    }

    #[test]
    fn wii_reads_block_count() {
        let mut src = ByteSource::from_vec(image(b"WII5", 0x460900 * 256));
        let n = Nasos::parse(&mut src).unwrap();
        assert!(n.disc_type.is_wii());
        assert_eq!(n.block_count().unwrap(), 0x460900);
        assert_eq!(n.original_size().unwrap(), 4_699_979_776);
    }

    #[test]
    fn wii_needs_the_long_header() {
        let mut src = ByteSource::from_vec(image(b"WII9", 0)[..0x18].to_vec());
        assert!(Nasos::parse(&mut src).unwrap_err().is_truncation());
    }
}
