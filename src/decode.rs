//! Fixed-layout struct decoding.
//!
//! A [`Schema`] is a declarative description of one on-disk struct: its
//! size, byte order, optional magic signature and named fields at fixed
//! offsets. [`decode`] reads `schema.size` bytes from a [`ByteSource`],
//! checks the magic, converts every field to host order and returns a
//! [`DecodedRecord`]. Decoding is all-or-nothing; nothing is returned until
//! every byte has been read and checked.
//!
//! ```rust
//! use romkit::decode::{ByteOrder, FieldSpec, Kind, Magic, Schema, decode};
//! use romkit::file::ByteSource;
//!
//! static HDR: Schema = Schema {
//!     name: "demo",
//!     size: 8,
//!     byte_order: ByteOrder::Big,
//!     magic: Some(Magic::new(0, b"DEMO")),
//!     fields: &[FieldSpec::new("count", 4, Kind::U32)],
//! };
//!
//! let mut src = ByteSource::from_slice(b"DEMO\0\0\x01\x00");
//! let rec = decode(&mut src, 0, &HDR).unwrap();
//! assert_eq!(rec.u32("count").unwrap(), 256);
//! ```

use crate::file::ByteSource;
use crate::text::{Legacy8Bit, decode_legacy_8bit};
use crate::{Error, Result};

/// Byte order of multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// The host's byte order.
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::Little;
    /// The host's byte order.
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::Big;

    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }

    #[inline]
    pub fn u16_from(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn u32_from(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    #[inline]
    pub fn u64_from(self, b: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Little => u64::from_le_bytes(b),
            ByteOrder::Big => u64::from_be_bytes(b),
        }
    }
}

/// On-disk type of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Raw bytes, copied as-is.
    Bytes(usize),
    /// Fixed-width, NUL-padded single-byte text.
    Text(usize, Legacy8Bit),
}

impl Kind {
    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Kind::U8 | Kind::I8 => 1,
            Kind::U16 | Kind::I16 => 2,
            Kind::U32 | Kind::I32 | Kind::F32 => 4,
            Kind::U64 | Kind::I64 | Kind::F64 => 8,
            Kind::Bytes(n) | Kind::Text(n, _) => n,
        }
    }

    fn read(self, b: &[u8], order: ByteOrder) -> Value {
        let a2 = || [b[0], b[1]];
        let a4 = || [b[0], b[1], b[2], b[3]];
        let a8 = || [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        match self {
            Kind::U8 => Value::U8(b[0]),
            Kind::I8 => Value::I8(b[0] as i8),
            Kind::U16 => Value::U16(order.u16_from(a2())),
            Kind::I16 => Value::I16(order.u16_from(a2()) as i16),
            Kind::U32 => Value::U32(order.u32_from(a4())),
            Kind::I32 => Value::I32(order.u32_from(a4()) as i32),
            Kind::F32 => Value::F32(f32::from_bits(order.u32_from(a4()))),
            Kind::U64 => Value::U64(order.u64_from(a8())),
            Kind::I64 => Value::I64(order.u64_from(a8()) as i64),
            Kind::F64 => Value::F64(f64::from_bits(order.u64_from(a8()))),
            Kind::Bytes(n) => Value::Bytes(b[..n].to_vec()),
            Kind::Text(n, variant) => Value::Text(decode_legacy_8bit(&b[..n], variant)),
        }
    }
}

/// A named field at a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: Kind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, kind: Kind) -> Self {
        Self { name, offset, kind }
    }
}

/// A signature compared byte-for-byte, independent of the struct's byte
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Magic {
    pub offset: usize,
    pub bytes: &'static [u8],
}

impl Magic {
    pub const fn new(offset: usize, bytes: &'static [u8]) -> Self {
        Self { offset, bytes }
    }

    /// Whether `buf` holds this signature at its offset.
    pub fn matches(&self, buf: &[u8]) -> bool {
        self.offset
            .checked_add(self.bytes.len())
            .and_then(|end| buf.get(self.offset..end))
            == Some(self.bytes)
    }

    /// First byte after the signature.
    pub fn end(&self) -> usize {
        self.offset + self.bytes.len()
    }
}

/// Declarative layout of one fixed-size struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    pub size: usize,
    pub byte_order: ByteOrder,
    pub magic: Option<Magic>,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// Check that the magic and every field fit inside `size`.
    pub fn validate(&self) -> Result<()> {
        if let Some(m) = &self.magic {
            if m.end() > self.size {
                return Err(Error::Parse("schema magic out of bounds"));
            }
        }
        for f in self.fields {
            match f.offset.checked_add(f.kind.width()) {
                Some(end) if end <= self.size => {}
                _ => return Err(Error::Parse("schema field out of bounds")),
            }
        }
        Ok(())
    }
}

/// A decoded field value, already in host order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Text(String),
}

/// The byte-order-normalized result of decoding one struct.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    schema: &'static Schema,
    offset: u64,
    raw: Vec<u8>,
    values: Vec<(&'static str, Value)>,
}

macro_rules! accessor {
    ($($name:ident => $variant:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($ty), "` field called `name`.")]
            pub fn $name(&self, name: &str) -> Result<$ty> {
                match self.get(name) {
                    Some(Value::$variant(v)) => Ok(*v),
                    _ => Err(Error::Parse(concat!("no ", stringify!($ty), " field by that name"))),
                }
            }
        )*
    };
}

impl DecodedRecord {
    /// The schema this record was decoded with.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Offset within the source the record was read from.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The undecoded bytes, in on-disk order.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find_map(|(n, v)| (*n == name).then_some(v))
    }

    accessor! {
        u8 => U8: u8,
        u16 => U16: u16,
        u32 => U32: u32,
        u64 => U64: u64,
        i8 => I8: i8,
        i16 => I16: i16,
        i32 => I32: i32,
        i64 => I64: i64,
        f32 => F32: f32,
        f64 => F64: f64,
    }

    /// A [`Kind::Bytes`] field.
    pub fn bytes(&self, name: &str) -> Result<&[u8]> {
        match self.get(name) {
            Some(Value::Bytes(v)) => Ok(v),
            _ => Err(Error::Parse("no bytes field by that name")),
        }
    }

    /// A [`Kind::Text`] field.
    pub fn str(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(Value::Text(v)) => Ok(v),
            _ => Err(Error::Parse("no text field by that name")),
        }
    }
}

/// Decode `schema` from `src` at `offset`.
///
/// Fails with [`Error::Truncated`] if fewer than `schema.size` bytes are
/// available and [`Error::BadMagic`] if the signature does not match.
pub fn decode(src: &mut ByteSource, offset: u64, schema: &'static Schema) -> Result<DecodedRecord> {
    schema.validate()?;
    let mut raw = vec![0u8; schema.size];
    src.read_exact_at(offset, &mut raw)?;
    decode_owned(raw, offset, schema)
}

/// Decode `schema` from an in-memory buffer holding at least `schema.size`
/// bytes.
pub fn decode_bytes(buf: &[u8], schema: &'static Schema) -> Result<DecodedRecord> {
    schema.validate()?;
    let raw = buf.get(..schema.size).ok_or(Error::Truncated {
        offset: 0,
        needed: schema.size,
        available: buf.len(),
    })?;
    decode_owned(raw.to_vec(), 0, schema)
}

fn decode_owned(raw: Vec<u8>, offset: u64, schema: &'static Schema) -> Result<DecodedRecord> {
    if let Some(m) = &schema.magic {
        if !m.matches(&raw) {
            return Err(Error::BadMagic {
                record: schema.name,
            });
        }
    }
    let values = schema
        .fields
        .iter()
        .map(|f| {
            let end = f.offset + f.kind.width();
            (f.name, f.kind.read(&raw[f.offset..end], schema.byte_order))
        })
        .collect();
    Ok(DecodedRecord {
        schema,
        offset,
        raw,
        values,
    })
}
