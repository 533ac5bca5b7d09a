//! The format-agnostic presentation model.
//!
//! Every format reader fills a [`FieldModel`]: an ordered list of named,
//! typed [`Field`]s whose insertion order is display order. Fields can be
//! grouped under tabs. A separate [`MetaData`] collection carries the
//! smaller set of standard properties (title, composer, ...) a host system
//! indexes.
//!
//! Fields are append-only. There is no mutable access to a field once it
//! has been added, so its type tag never changes.

mod age;
mod metadata;

use std::fmt;

use bitflags::bitflags;
use chrono::{DateTime, Utc};

pub use age::{AgeRating, AgeRatingSystem, AgeRatings};
pub use metadata::{MetaData, MetaKind, MetaValue, Property};

bitflags! {
    /// Presentation hints for string fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StringFlags: u32 {
        /// Render in a fixed-width font (IDs, hashes).
        const MONOSPACE = 1 << 0;
        /// Highlight as a warning.
        const WARNING = 1 << 1;
        /// Multi-line credits text.
        const CREDITS = 1 << 2;
    }
}

bitflags! {
    /// Which parts of a timestamp are meaningful.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DateTimeFlags: u32 {
        const HAS_DATE = 1 << 0;
        const HAS_TIME = 1 << 1;
    }
}

/// Radix used to display a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Base {
    #[default]
    Dec,
    Hex,
    Oct,
}

/// An integer with its signedness preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
}

/// Named bits of an integer flag field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    pub value: u32,
    /// Display name per bit, least significant first. `None` = unused bit.
    pub names: Vec<Option<String>>,
    /// Items per row in a grid presentation.
    pub per_row: usize,
}

impl Bitfield {
    pub fn is_set(&self, bit: usize) -> bool {
        bit < 32 && self.value & (1 << bit) != 0
    }

    /// Names of the bits that are set.
    pub fn set_names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .enumerate()
            .filter(|&(bit, _)| self.is_set(bit))
            .filter_map(|(_, n)| n.as_deref())
    }
}

/// A table with a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Type tag of a [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Number,
    Bitfield,
    DateTime,
    AgeRatings,
    ListData,
    StringList,
}

/// Typed payload of a [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String {
        value: String,
        flags: StringFlags,
    },
    Number {
        value: Number,
        base: Base,
        /// Minimum digit count (zero-padded).
        digits: u8,
    },
    Bitfield(Bitfield),
    DateTime {
        /// [`None`] if the stored timestamp is unset or invalid.
        value: Option<DateTime<Utc>>,
        flags: DateTimeFlags,
    },
    AgeRatings(AgeRatings),
    ListData(ListData),
    StringList(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String { .. } => FieldKind::String,
            FieldValue::Number { .. } => FieldKind::Number,
            FieldValue::Bitfield(_) => FieldKind::Bitfield,
            FieldValue::DateTime { .. } => FieldKind::DateTime,
            FieldValue::AgeRatings(_) => FieldKind::AgeRatings,
            FieldValue::ListData(_) => FieldKind::ListData,
            FieldValue::StringList(_) => FieldKind::StringList,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Single-line rendering for plain-text hosts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String { value, .. } => f.write_str(value),
            FieldValue::Number {
                value,
                base,
                digits,
            } => {
                let w = *digits as usize;
                match (value, base) {
                    (Number::Unsigned(v), Base::Dec) => write!(f, "{v:0w$}"),
                    (Number::Signed(v), Base::Dec) => write!(f, "{v:0w$}"),
                    (Number::Unsigned(v), Base::Hex) => write!(f, "0x{v:0w$X}"),
                    (Number::Signed(v), Base::Hex) => write!(f, "0x{v:0w$X}"),
                    (Number::Unsigned(v), Base::Oct) => write!(f, "0{v:0w$o}"),
                    (Number::Signed(v), Base::Oct) => write!(f, "0{v:0w$o}"),
                }
            }
            FieldValue::Bitfield(bf) => {
                let names: Vec<_> = bf.set_names().collect();
                if names.is_empty() {
                    f.write_str("(none)")
                } else {
                    f.write_str(&names.join(", "))
                }
            }
            FieldValue::DateTime { value, flags } => match value {
                None => f.write_str("Unknown"),
                Some(dt) => {
                    let date = flags.contains(DateTimeFlags::HAS_DATE);
                    let time = flags.contains(DateTimeFlags::HAS_TIME);
                    match (date, time) {
                        (true, true) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                        (false, true) => write!(f, "{}", dt.format("%H:%M:%S")),
                        _ => write!(f, "{}", dt.format("%Y-%m-%d")),
                    }
                }
            },
            FieldValue::AgeRatings(r) => write!(f, "{r}"),
            FieldValue::ListData(l) => write!(f, "{} row(s)", l.rows.len()),
            FieldValue::StringList(v) => f.write_str(&v.join(", ")),
        }
    }
}

/// One named presentation field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    tab: usize,
    value: FieldValue,
}

impl Field {
    /// Display name. Not necessarily unique within a model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index of the tab this field is shown on.
    pub fn tab(&self) -> usize {
        self.tab
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }

    /// Unsigned payload of a number field.
    pub fn as_unsigned(&self) -> Option<u64> {
        match self.value {
            FieldValue::Number {
                value: Number::Unsigned(v),
                ..
            } => Some(v),
            _ => None,
        }
    }

    /// Payload of a string field.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::String { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Ordered collection of presentation fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    fields: Vec<Field>,
    tabs: Vec<String>,
    current_tab: usize,
}

impl Default for FieldModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldModel {
    /// An empty model with a single unnamed tab.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            tabs: vec![String::new()],
            current_tab: 0,
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.fields.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// First field named `name`.
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Tab names. Tab 0 always exists.
    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    /// Rename an existing tab. Out-of-range indices are ignored.
    pub fn set_tab_name(&mut self, idx: usize, name: impl Into<String>) {
        if let Some(t) = self.tabs.get_mut(idx) {
            *t = name.into();
        }
    }

    /// Start a new tab; subsequent fields are placed on it.
    pub fn add_tab(&mut self, name: impl Into<String>) -> usize {
        self.tabs.push(name.into());
        self.current_tab = self.tabs.len() - 1;
        self.current_tab
    }

    fn push(&mut self, name: impl Into<String>, value: FieldValue) -> usize {
        self.fields.push(Field {
            name: name.into(),
            tab: self.current_tab,
            value,
        });
        self.fields.len() - 1
    }

    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> usize {
        self.add_string_flags(name, value, StringFlags::empty())
    }

    pub fn add_string_flags(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        flags: StringFlags,
    ) -> usize {
        let value = FieldValue::String {
            value: value.into(),
            flags,
        };
        self.push(name, value)
    }

    pub fn add_unsigned(
        &mut self,
        name: impl Into<String>,
        value: u64,
        base: Base,
        digits: u8,
    ) -> usize {
        let value = FieldValue::Number {
            value: Number::Unsigned(value),
            base,
            digits,
        };
        self.push(name, value)
    }

    pub fn add_signed(
        &mut self,
        name: impl Into<String>,
        value: i64,
        base: Base,
        digits: u8,
    ) -> usize {
        let value = FieldValue::Number {
            value: Number::Signed(value),
            base,
            digits,
        };
        self.push(name, value)
    }

    /// Add a bitfield. `names` lists bits from least significant up.
    pub fn add_bitfield(
        &mut self,
        name: impl Into<String>,
        value: u32,
        names: &[Option<&str>],
        per_row: usize,
    ) -> usize {
        let bf = Bitfield {
            value,
            names: names.iter().map(|n| n.map(str::to_owned)).collect(),
            per_row,
        };
        self.push(name, FieldValue::Bitfield(bf))
    }

    pub fn add_datetime(
        &mut self,
        name: impl Into<String>,
        value: Option<DateTime<Utc>>,
        flags: DateTimeFlags,
    ) -> usize {
        self.push(name, FieldValue::DateTime { value, flags })
    }

    pub fn add_age_ratings(&mut self, name: impl Into<String>, ratings: AgeRatings) -> usize {
        self.push(name, FieldValue::AgeRatings(ratings))
    }

    pub fn add_list_data(
        &mut self,
        name: impl Into<String>,
        headers: &[&str],
        rows: Vec<Vec<String>>,
    ) -> usize {
        let list = ListData {
            headers: headers.iter().map(|h| (*h).to_owned()).collect(),
            rows,
        };
        self.push(name, FieldValue::ListData(list))
    }

    pub fn add_string_list(&mut self, name: impl Into<String>, values: Vec<String>) -> usize {
        self.push(name, FieldValue::StringList(values))
    }
}

impl<'a> IntoIterator for &'a FieldModel {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
