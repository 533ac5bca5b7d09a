//! NSF - NES Sound Format.
//!
//! Ripped Famicom/NES music: the 6502 sound driver and song data, plus a
//! fixed header describing how to play it.
//!
//! ## Layout (0x80 bytes, all fields little-endian)
//! ```text
//! [0x00] Magic "NESM\x1A\x01"        (6 bytes; last byte is the version)
//! [0x06] TrackCount                  (u8)
//! [0x07] DefaultTrack                (u8, 1-based)
//! [0x08] LoadAddress                 (u16)
//! [0x0A] InitAddress                 (u16)
//! [0x0C] PlayAddress                 (u16)
//! [0x0E] Title                       (32 bytes, NUL-padded)
//! [0x2E] Composer                    (32 bytes, NUL-padded)
//! [0x4E] Copyright                   (32 bytes, NUL-padded)
//! [0x6E] NtscRate  - µs per frame    (u16)
//! [0x70] Bankswitch init             (8 bytes)
//! [0x78] PalRate   - µs per frame    (u16)
//! [0x7A] TvSystem                    (u8: 0 NTSC, 1 PAL, 2 both)
//! [0x7B] ExpansionAudio              (u8 bitfield)
//! [0x7C] Reserved                    (4 bytes)
//! ```
//!
//! ## Notes
//! * Detection only needs the magic, so anything from 0x10 bytes on is
//!   claimed. The whole 0x80-byte header is mandatory; a shorter file is
//!   recognized but invalid.

use crate::Result;
use crate::decode::{ByteOrder, DecodedRecord, FieldSpec, Kind, Magic, Schema, decode};
use crate::fields::{Base, Property};
use crate::file::ByteSource;
use crate::registry::{DetectInfo, FileType, FormatDescriptor};
use crate::romdata::{FormatReader, LoadContext};
use crate::text::Legacy8Bit;

const MAGIC: Magic = Magic::new(0, b"NESM\x1A\x01");

/// The 128-byte NSF header.
pub static HEADER: Schema = Schema {
    name: "NSF header",
    size: 0x80,
    byte_order: ByteOrder::Little,
    magic: Some(MAGIC),
    fields: &[
        FieldSpec::new("track_count", 0x06, Kind::U8),
        FieldSpec::new("default_track", 0x07, Kind::U8),
        FieldSpec::new("load_address", 0x08, Kind::U16),
        FieldSpec::new("init_address", 0x0A, Kind::U16),
        FieldSpec::new("play_address", 0x0C, Kind::U16),
        FieldSpec::new("title", 0x0E, Kind::Text(32, Legacy8Bit::Latin1)),
        FieldSpec::new("composer", 0x2E, Kind::Text(32, Legacy8Bit::Latin1)),
        FieldSpec::new("copyright", 0x4E, Kind::Text(32, Legacy8Bit::Latin1)),
        FieldSpec::new("ntsc_rate", 0x6E, Kind::U16),
        FieldSpec::new("bankswitch", 0x70, Kind::Bytes(8)),
        FieldSpec::new("pal_rate", 0x78, Kind::U16),
        FieldSpec::new("tv_system", 0x7A, Kind::U8),
        FieldSpec::new("expansion_audio", 0x7B, Kind::U8),
    ],
};

const EXPANSION_NAMES: [Option<&str>; 6] = [
    Some("Konami VRC6"),
    Some("Konami VRC7"),
    Some("2C33 (Famicom Disk System)"),
    Some("MMC5"),
    Some("Namco N163"),
    Some("Sunsoft 5B"),
];

pub const DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "NSF",
    system: "NES Sound Format",
    file_type: FileType::AudioFile,
    byte_order: ByteOrder::Little,
    magic: &[MAGIC],
    min_size: 0x10,
    extensions: &[".nsf"],
    magic_authoritative: true,
    verify: None,
    open,
};

/// Decoded NSF header.
#[derive(Debug)]
pub struct Nsf {
    header: DecodedRecord,
}

impl Nsf {
    /// Decode the header at the start of `src`.
    pub fn parse(src: &mut ByteSource) -> Result<Self> {
        let header = decode(src, 0, &HEADER)?;
        if header.u8("track_count")? == 0 {
            log::debug!("NSF header declares zero tracks");
        }
        Ok(Self { header })
    }

    pub fn header(&self) -> &DecodedRecord {
        &self.header
    }
}

fn tv_system_name(v: u8) -> String {
    match v {
        0 => "NTSC".into(),
        1 => "PAL".into(),
        2 => "NTSC & PAL".into(),
        n => format!("Unknown ({n})"),
    }
}

fn open(src: &mut ByteSource, _info: &DetectInfo<'_>) -> Result<Box<dyn FormatReader>> {
    Ok(Box::new(Nsf::parse(src)?))
}

impl FormatReader for Nsf {
    fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
        let h = &self.header;
        let title = h.str("title")?;
        let composer = h.str("composer")?;
        let copyright = h.str("copyright")?;

        let f = &mut ctx.fields;
        f.reserve(10);
        f.add_string("Title", title);
        f.add_string("Composer", composer);
        f.add_string("Copyright", copyright);
        f.add_unsigned("Track Count", h.u8("track_count")?.into(), Base::Dec, 0);
        f.add_unsigned("Default Track #", h.u8("default_track")?.into(), Base::Dec, 0);
        f.add_unsigned("Load Address", h.u16("load_address")?.into(), Base::Hex, 4);
        f.add_unsigned("Init Address", h.u16("init_address")?.into(), Base::Hex, 4);
        f.add_unsigned("Play Address", h.u16("play_address")?.into(), Base::Hex, 4);
        f.add_string("TV System", tv_system_name(h.u8("tv_system")?));
        f.add_bitfield(
            "Expansion Audio",
            h.u8("expansion_audio")?.into(),
            &EXPANSION_NAMES,
            3,
        );

        let m = &mut ctx.metadata;
        m.add_string(Property::Title, title);
        m.add_string(Property::Composer, composer);
        m.add_string(Property::Copyright, copyright);
        Ok(())
    }
}
