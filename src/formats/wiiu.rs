//! Wii U disc image (`.wud`, `.wux`).
//!
//! The disc starts with a printable product-code string. A second signature
//! at 0x10000 separates real disc images from other files that happen to
//! start with `WUP-`.
//!
//! ## Disc header
//! ```text
//! [0x00] "WUP-"                     (4 bytes)
//! [0x04] Product type, 'P'          (1 byte)
//! [0x05] '-'
//! [0x06] Game ID (ID4)              (4 bytes ASCII, e.g. "ARPE")
//! [0x0A] '-'
//! [0x0B] Version                    (2 ASCII digits)
//! [0x0D] "-V"
//! [0x0F] OS version                 (3 ASCII digits, "550" = 5.5.0)
//! [0x12] '-'
//! [0x13] Region                     (1 ASCII char)
//! [0x14] "-D"
//! [0x16] Disc number                (1 ASCII digit)
//! [0x17] Padding                    (to 0x20)
//! ...
//! [0x10000] Secondary magic         (u32 BE, 0xCC549EB9)
//! ```

use crate::decode::{ByteOrder, DecodedRecord, FieldSpec, Kind, Magic, Schema, decode};
use crate::fields::{Base, Property, StringFlags};
use crate::file::ByteSource;
use crate::registry::{DetectInfo, FileType, FormatDescriptor};
use crate::romdata::{FormatReader, LoadContext};
use crate::text::Legacy8Bit;
use crate::{Error, Result};

const MAGIC: Magic = Magic::new(0, b"WUP-");

pub const SECONDARY_MAGIC_OFFSET: u64 = 0x10000;
pub const SECONDARY_MAGIC: u32 = 0xCC54_9EB9;

pub static HEADER: Schema = Schema {
    name: "Wii U disc header",
    size: 0x20,
    byte_order: ByteOrder::Big,
    magic: Some(MAGIC),
    fields: &[
        FieldSpec::new("id4", 0x06, Kind::Text(4, Legacy8Bit::Ascii)),
        FieldSpec::new("version", 0x0B, Kind::Text(2, Legacy8Bit::Ascii)),
        FieldSpec::new("os_version", 0x0F, Kind::Bytes(3)),
        FieldSpec::new("region", 0x13, Kind::U8),
        FieldSpec::new("disc_number", 0x16, Kind::U8),
    ],
};

static SECONDARY: Schema = Schema {
    name: "Wii U secondary magic",
    size: 4,
    byte_order: ByteOrder::Big,
    magic: None,
    fields: &[FieldSpec::new("magic", 0, Kind::U32)],
};

pub const DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "WiiU",
    system: "Nintendo Wii U",
    file_type: FileType::DiscImage,
    byte_order: ByteOrder::Big,
    magic: &[MAGIC],
    min_size: SECONDARY_MAGIC_OFFSET + 4,
    extensions: &[".wud", ".wux"],
    magic_authoritative: true,
    verify: Some(has_separators),
    open,
};

fn has_separators(info: &DetectInfo<'_>) -> bool {
    info.header.get(0x05) == Some(&b'-') && info.header.get(0x0A) == Some(&b'-')
}

fn region_name(c: u8) -> String {
    match c {
        b'J' => "Japan".into(),
        b'E' => "USA".into(),
        b'P' => "Europe".into(),
        b'K' => "South Korea".into(),
        b'C' => "China".into(),
        b'T' => "Taiwan".into(),
        c if c.is_ascii_graphic() => format!("Unknown ({})", c as char),
        c => format!("Unknown (0x{c:02X})"),
    }
}

/// Decoded Wii U disc header.
#[derive(Debug)]
pub struct WiiU {
    header: DecodedRecord,
}

impl WiiU {
    /// Decode the disc header and check the secondary magic.
    pub fn parse(src: &mut ByteSource) -> Result<Self> {
        let header = decode(src, 0, &HEADER)?;
        let secondary = decode(src, SECONDARY_MAGIC_OFFSET, &SECONDARY)?;
        if secondary.u32("magic")? != SECONDARY_MAGIC {
            return Err(Error::BadMagic {
                record: SECONDARY.name,
            });
        }
        Ok(Self { header })
    }

    /// `"550"` → `"5.5.0"`.
    pub fn os_version(&self) -> Result<String> {
        let raw = self.header.bytes("os_version")?;
        let parts: Vec<String> = raw.iter().map(|&b| (b as char).to_string()).collect();
        Ok(parts.join("."))
    }

    pub fn disc_number(&self) -> Result<Option<u8>> {
        let d = self.header.u8("disc_number")?;
        Ok(d.is_ascii_digit().then(|| d - b'0'))
    }
}

fn open(src: &mut ByteSource, _info: &DetectInfo<'_>) -> Result<Box<dyn FormatReader>> {
    Ok(Box::new(WiiU::parse(src)?))
}

impl FormatReader for WiiU {
    fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
        let id4 = self.header.str("id4")?;
        let f = &mut ctx.fields;
        f.add_string_flags("Game ID", id4, StringFlags::MONOSPACE);
        f.add_string("Version", self.header.str("version")?);
        f.add_string("OS Version", self.os_version()?);
        f.add_string("Region", region_name(self.header.u8("region")?));
        match self.disc_number()? {
            Some(n) => f.add_unsigned("Disc #", n.into(), Base::Dec, 0),
            None => f.add_string_flags("Disc #", "Unknown", StringFlags::WARNING),
        };

        ctx.metadata.add_string(Property::GameId, id4);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal disc image with both signatures.
    pub(crate) fn sample() -> Vec<u8> {
        let mut b = vec![0u8; SECONDARY_MAGIC_OFFSET as usize + 4];
        b[..0x17].copy_from_slice(b"WUP-P-ARPE-00-V550-E-D1");
        b[0x10000..].copy_from_slice(&SECONDARY_MAGIC.to_be_bytes());
        b
    }

    #[test]
    fn disc_fields() {
        let mut src = ByteSource::from_vec(sample());
        let w = WiiU::parse(&mut src).unwrap();
        let mut ctx = LoadContext::new(&mut src, "WiiU");
        w.load(&mut ctx).unwrap();
        let f = &ctx.fields;
        assert_eq!(f.find("Game ID").and_then(|f| f.as_str()), Some("ARPE"));
        assert_eq!(f.find("Version").and_then(|f| f.as_str()), Some("00"));
        assert_eq!(f.find("OS Version").and_then(|f| f.as_str()), Some("5.5.0"));
        assert_eq!(f.find("Region").and_then(|f| f.as_str()), Some("USA"));
        assert_eq!(f.find("Disc #").and_then(|f| f.as_unsigned()), Some(1));
    }

    #[test]
    fn secondary_magic_is_mandatory() {
        let mut b = sample();
        b[0x10000] = 0;
        let err = WiiU::parse(&mut ByteSource::from_vec(b)).unwrap_err();
        assert!(err.is_bad_magic());

        let b = sample();
        let err = WiiU::parse(&mut ByteSource::from_slice(&b[..0x8000])).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn separators_checked_at_detection() {
        let b = sample();
        let info = DetectInfo {
            header: &b[..0x20],
            size: b.len() as u64,
            ext: None,
        };
        assert!(DESCRIPTOR.matches(&info));
        let mut bad = b[..0x20].to_vec();
        bad[5] = b'X';
        let info = DetectInfo {
            header: &bad,
            size: b.len() as u64,
            ext: None,
        };
        assert!(!DESCRIPTOR.matches(&info));
    }
}
