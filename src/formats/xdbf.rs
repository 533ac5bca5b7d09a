//! XDBF - Xbox 360 resource database.
//!
//! Embedded in XEX executables as the SPA (title resources) and used on its
//! own for GPD gamer-profile files. A header and an entry table index
//! resources by `(namespace, id)` inside a trailing data region.
//!
//! ## Layout (all fields big-endian)
//! ```text
//! [0x00] Magic "XDBF"                  (4 bytes)
//! [0x04] Version (0x10000)             (u32)
//! [0x08] EntryTableLength              (u32, in entries)
//! [0x0C] EntryCount  - used entries    (u32)
//! [0x10] FreeSpaceTableLength          (u32, in entries)
//! [0x14] FreeSpaceCount                (u32)
//! [0x18] EntryTable                    (EntryTableLength × 0x12 bytes)
//!        FreeSpaceTable                (FreeSpaceTableLength × 0x08 bytes)
//!        Data region                   (remaining bytes)
//! ```
//!
//! ## Entry (0x12 bytes)
//! ```text
//! [0x00] Namespace   (u16: 1 metadata, 2 image, 3 string table)
//! [0x02] ResourceId  (u64)
//! [0x0A] Offset      - relative to the data region (u32)
//! [0x0E] Length      (u32)
//! ```
//!
//! ## Resources read here
//! | Namespace | Id                   | Record | Contents |
//! |-----------|----------------------|--------|----------|
//! | 1         | `'XSTC'`             | XSTC   | Default language |
//! | 3         | language id          | XSTR   | UTF-8 string table; id 0x8000 is the title |
//! | 1         | `'XTHD'`             | XTHD   | Title id, type and version |
//! | 1         | `'XACH'`             | XACH   | Achievement list |
//!
//! The header and entry table are mandatory. Each resource above is
//! optional: a missing one is skipped silently, a malformed one is skipped
//! and recorded as a degradation.

use crate::decode::{ByteOrder, FieldSpec, Kind, Magic, Schema, decode};
use crate::fields::{Base, Property};
use crate::file::ByteSource;
use crate::registry::{DetectInfo, FileType, FormatDescriptor};
use crate::romdata::{FormatReader, LoadContext};
use crate::utils::{be_u16, be_u32, be_u64, bytesv, magic};
use crate::{Error, Result};

const MAGIC: Magic = Magic::new(0, b"XDBF");

const VERSION: u32 = 0x10000;
const ENTRY_SIZE: u64 = 0x12;
const FREE_SPACE_ENTRY_SIZE: u64 = 0x08;
const MAX_TABLE_ENTRIES: u32 = 0x10000;

const NS_METADATA: u16 = 1;
const NS_STRING_TABLE: u16 = 3;

const ID_XSTC: u64 = u32::from_be_bytes(*b"XSTC") as u64;
const ID_XTHD: u64 = u32::from_be_bytes(*b"XTHD") as u64;
const ID_XACH: u64 = u32::from_be_bytes(*b"XACH") as u64;

/// String id holding the game title in every language table.
pub const TITLE_STRING_ID: u16 = 0x8000;

const LANGUAGE_ENGLISH: u32 = 1;

pub static HEADER: Schema = Schema {
    name: "XDBF header",
    size: 0x18,
    byte_order: ByteOrder::Big,
    magic: Some(MAGIC),
    fields: &[
        FieldSpec::new("version", 0x04, Kind::U32),
        FieldSpec::new("entry_table_length", 0x08, Kind::U32),
        FieldSpec::new("entry_count", 0x0C, Kind::U32),
        FieldSpec::new("free_space_table_length", 0x10, Kind::U32),
        FieldSpec::new("free_space_count", 0x14, Kind::U32),
    ],
};

static XSTC: Schema = Schema {
    name: "XSTC",
    size: 0x10,
    byte_order: ByteOrder::Big,
    magic: Some(Magic::new(0, b"XSTC")),
    fields: &[
        FieldSpec::new("version", 0x04, Kind::U32),
        FieldSpec::new("size", 0x08, Kind::U32),
        FieldSpec::new("default_language", 0x0C, Kind::U32),
    ],
};

static XTHD: Schema = Schema {
    name: "XTHD",
    size: 0x2C,
    byte_order: ByteOrder::Big,
    magic: Some(Magic::new(0, b"XTHD")),
    fields: &[
        FieldSpec::new("version", 0x04, Kind::U32),
        FieldSpec::new("title_id", 0x0C, Kind::U32),
        FieldSpec::new("title_type", 0x10, Kind::U32),
        FieldSpec::new("major", 0x14, Kind::U16),
        FieldSpec::new("minor", 0x16, Kind::U16),
        FieldSpec::new("build", 0x18, Kind::U16),
        FieldSpec::new("revision", 0x1A, Kind::U16),
    ],
};

/// Size of the XSTR and XACH headers: magic, version, size, count.
const TABLE_HEADER_SIZE: u64 = 14;
const XACH_ENTRY_SIZE: u64 = 0x24;

pub const DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "XDBF",
    system: "Microsoft Xbox 360",
    file_type: FileType::ResourceLibrary,
    byte_order: ByteOrder::Big,
    magic: &[MAGIC],
    min_size: 0x18,
    extensions: &[".xdbf", ".spa", ".gpd"],
    magic_authoritative: true,
    verify: None,
    open,
};

/// One entry-table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub namespace: u16,
    pub resource_id: u64,
    /// Relative to the data region.
    pub offset: u32,
    pub length: u32,
}

/// Parsed XDBF header and entry table.
#[derive(Debug)]
pub struct Xdbf {
    pub entries: Vec<Entry>,
    /// Absolute offset of the data region.
    pub data_offset: u64,
    gpd: bool,
}

/// One achievement from the XACH table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Achievement {
    id: u16,
    title_id: u16,
    unlocked_desc_id: u16,
    gamerscore: u16,
}

impl Xdbf {
    /// Decode the header and the used part of the entry table.
    pub fn parse(src: &mut ByteSource) -> Result<Self> {
        let hdr = decode(src, 0, &HEADER)?;
        let version = hdr.u32("version")?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let table_len = hdr.u32("entry_table_length")?;
        let count = hdr.u32("entry_count")?;
        let free_len = hdr.u32("free_space_table_length")?;
        if table_len > MAX_TABLE_ENTRIES || free_len > MAX_TABLE_ENTRIES {
            return Err(Error::Parse("XDBF table too large"));
        }
        if count > table_len {
            return Err(Error::Parse("XDBF entry count exceeds table length"));
        }

        let tables = table_len as u64 * ENTRY_SIZE + free_len as u64 * FREE_SPACE_ENTRY_SIZE;
        let data_offset = HEADER.size as u64 + tables;
        let size = src.size()?;
        if size < data_offset {
            return Err(Error::Truncated {
                offset: HEADER.size as u64,
                needed: tables as usize,
                available: size.saturating_sub(HEADER.size as u64) as usize,
            });
        }

        let mut table = src.sub_range(HEADER.size as u64, count as u64 * ENTRY_SIZE)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(Entry {
                namespace: be_u16(&mut table)?,
                resource_id: be_u64(&mut table)?,
                offset: be_u32(&mut table)?,
                length: be_u32(&mut table)?,
            });
        }
        log::trace!("XDBF: {count} entries, data region at {data_offset:#x}");

        Ok(Self {
            entries,
            data_offset,
            gpd: false,
        })
    }

    /// Look up a resource by namespace and id.
    pub fn find(&self, namespace: u16, resource_id: u64) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.namespace == namespace && e.resource_id == resource_id)
    }

    /// A view of the data region.
    fn data_region(&self, src: &ByteSource) -> Result<ByteSource> {
        let size = src.size()?;
        src.sub_range(self.data_offset, size.saturating_sub(self.data_offset))
    }

    /// A view of one resource inside the data region.
    fn resource(data: &ByteSource, entry: &Entry) -> Result<ByteSource> {
        data.sub_range(entry.offset as u64, entry.length as u64)
    }
}

fn read_default_language(view: &mut ByteSource) -> Result<u32> {
    decode(view, 0, &XSTC)?.u32("default_language")
}

/// Parse an XSTR string table into `(id, text)` pairs.
fn read_string_table(view: &mut ByteSource) -> Result<Vec<(u16, String)>> {
    let len = view.size()?;
    magic(view, b"XSTR", "XSTR")?;
    let _version = be_u32(view)?;
    let size = be_u32(view)?;
    if size as u64 + 8 > len {
        return Err(Error::InvalidRange);
    }
    let count = be_u16(view)?;

    let mut strings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = be_u16(view)?;
        let slen = be_u16(view)? as u64;
        if view.tell() + slen > len {
            return Err(Error::InvalidRange);
        }
        let raw = bytesv(view, slen as usize)?;
        strings.push((id, String::from_utf8_lossy(&raw).into_owned()));
    }
    Ok(strings)
}

fn read_achievements(view: &mut ByteSource) -> Result<Vec<Achievement>> {
    let len = view.size()?;
    magic(view, b"XACH", "XACH")?;
    let _version = be_u32(view)?;
    let _size = be_u32(view)?;
    let count = be_u16(view)?;
    if TABLE_HEADER_SIZE + count as u64 * XACH_ENTRY_SIZE > len {
        return Err(Error::InvalidRange);
    }

    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let entry = bytesv(view, XACH_ENTRY_SIZE as usize)?;
        let u16_at = |o: usize| u16::from_be_bytes([entry[o], entry[o + 1]]);
        out.push(Achievement {
            id: u16_at(0x00),
            title_id: u16_at(0x02),
            unlocked_desc_id: u16_at(0x04),
            gamerscore: u16_at(0x0C),
        });
    }
    Ok(out)
}

fn language_name(id: u32) -> String {
    match id {
        1 => "English".into(),
        2 => "Japanese".into(),
        3 => "German".into(),
        4 => "French".into(),
        5 => "Spanish".into(),
        6 => "Italian".into(),
        7 => "Korean".into(),
        8 => "Chinese".into(),
        n => format!("Unknown ({n})"),
    }
}

fn title_type_name(t: u32) -> String {
    match t {
        0 => "System Title".into(),
        1 => "Full Game".into(),
        2 => "Demo".into(),
        3 => "Download".into(),
        n => format!("Unknown ({n})"),
    }
}

/// `4D5307E6 (MS-2022)`: two id characters and a serial.
fn format_title_id(id: u32) -> String {
    let [a, b, ..] = id.to_be_bytes();
    format!("{id:08X} ({}{}-{:04})", a as char, b as char, id & 0xFFFF)
}

/// Whether a filename or bare extension names a `.gpd` save file.
fn is_gpd(hint: &str) -> bool {
    let h = hint.to_ascii_lowercase();
    h == "gpd" || h.ends_with(".gpd")
}

fn open(src: &mut ByteSource, info: &DetectInfo<'_>) -> Result<Box<dyn FormatReader>> {
    let mut xdbf = Xdbf::parse(src)?;
    xdbf.gpd = info.ext.is_some_and(is_gpd);
    Ok(Box::new(xdbf))
}

impl FormatReader for Xdbf {
    fn file_type(&self) -> Option<FileType> {
        self.gpd.then_some(FileType::SaveFile)
    }

    fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
        let data = self.data_region(ctx.src)?;

        let mut language = LANGUAGE_ENGLISH;
        if let Some(e) = self.find(NS_METADATA, ID_XSTC) {
            let res = Self::resource(&data, e).and_then(|mut v| read_default_language(&mut v));
            if let Some(l) = ctx.optional("XSTC", res) {
                language = l;
            }
        }

        let table = self
            .find(NS_STRING_TABLE, language as u64)
            .or_else(|| self.find(NS_STRING_TABLE, LANGUAGE_ENGLISH as u64));
        let mut strings = Vec::new();
        if let Some(e) = table {
            let res = Self::resource(&data, e).and_then(|mut v| read_string_table(&mut v));
            strings = ctx.optional("XSTR", res).unwrap_or_default();
        }
        let string = |id: u16| {
            strings
                .iter()
                .find_map(|(i, s)| (*i == id).then_some(s.as_str()))
        };

        if let Some(title) = string(TITLE_STRING_ID) {
            ctx.fields.add_string("Title", title);
            ctx.metadata.add_string(Property::Title, title);
        }

        if let Some(e) = self.find(NS_METADATA, ID_XTHD) {
            let res = Self::resource(&data, e).and_then(|mut v| decode(&mut v, 0, &XTHD));
            if let Some(thd) = ctx.optional("XTHD", res) {
                let title_id = thd.u32("title_id")?;
                ctx.fields.add_string("Title ID", format_title_id(title_id));
                ctx.fields
                    .add_string("Title Type", title_type_name(thd.u32("title_type")?));
                let version = format!(
                    "{}.{}.{}.{}",
                    thd.u16("major")?,
                    thd.u16("minor")?,
                    thd.u16("build")?,
                    thd.u16("revision")?
                );
                ctx.fields.add_string("Version", version);
                ctx.metadata
                    .add_string(Property::GameId, format!("{title_id:08X}"));
            }
        }

        ctx.fields.add_string("Default Language", language_name(language));
        ctx.fields
            .add_unsigned("Resource Count", self.entries.len() as u64, Base::Dec, 0);

        if let Some(e) = self.find(NS_METADATA, ID_XACH) {
            let res = Self::resource(&data, e).and_then(|mut v| read_achievements(&mut v));
            if let Some(list) = ctx.optional("XACH", res) {
                let rows = list
                    .iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            string(a.title_id).unwrap_or_default().to_owned(),
                            string(a.unlocked_desc_id).unwrap_or_default().to_owned(),
                            a.gamerscore.to_string(),
                        ]
                    })
                    .collect();
                ctx.fields.add_list_data(
                    "Achievements",
                    &["ID", "Name", "Description", "Gamerscore"],
                    rows,
                );
            }
        }
        Ok(())
    }
}
