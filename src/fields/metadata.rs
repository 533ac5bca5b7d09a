//! Free-form metadata for system-level indexing.
//!
//! Independent of the presentation [`super::FieldModel`]: usually a handful
//! of standard properties (title, composer, copyright) a desktop search or
//! media index understands. Each property has a fixed value kind and
//! appears at most once.

/// Standard properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Title,
    Artist,
    Album,
    Composer,
    Copyright,
    Publisher,
    Description,
    Genre,
    GameId,
    /// Milliseconds.
    Duration,
    TrackNumber,
    DiscNumber,
    ReleaseYear,
}

/// Value kind a property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    String,
    Integer,
}

impl Property {
    pub fn kind(self) -> MetaKind {
        match self {
            Property::Duration
            | Property::TrackNumber
            | Property::DiscNumber
            | Property::ReleaseYear => MetaKind::Integer,
            _ => MetaKind::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    String(String),
    Integer(i64),
}

/// Property → value collection. Setting a property again replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: Vec<(Property, MetaValue)>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, prop: Property) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find_map(|(p, v)| (*p == prop).then_some(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Property, MetaValue)> {
        self.entries.iter()
    }

    fn set(&mut self, prop: Property, value: MetaValue) {
        match self.entries.iter_mut().find(|(p, _)| *p == prop) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((prop, value)),
        }
    }

    /// Set a string property. Empty strings are skipped.
    ///
    /// Returns `false` if `prop` is not a string property.
    pub fn add_string(&mut self, prop: Property, value: impl Into<String>) -> bool {
        if prop.kind() != MetaKind::String {
            log::debug!("metadata property {prop:?} does not take a string");
            return false;
        }
        let value = value.into();
        if !value.is_empty() {
            self.set(prop, MetaValue::String(value));
        }
        true
    }

    /// Set an integer property.
    ///
    /// Returns `false` if `prop` is not an integer property.
    pub fn add_integer(&mut self, prop: Property, value: i64) -> bool {
        if prop.kind() != MetaKind::Integer {
            log::debug!("metadata property {prop:?} does not take an integer");
            return false;
        }
        self.set(prop, MetaValue::Integer(value));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_and_checks_kind() {
        let mut m = MetaData::new();
        assert!(m.add_string(Property::Title, "First"));
        assert!(m.add_string(Property::Title, "Second"));
        assert!(m.add_string(Property::Composer, ""));
        assert!(!m.add_string(Property::Duration, "long"));
        assert!(m.add_integer(Property::TrackNumber, 3));
        assert!(!m.add_integer(Property::Title, 3));

        assert_eq!(m.len(), 2);
        assert_eq!(
            m.get(Property::Title),
            Some(&MetaValue::String("Second".into()))
        );
        assert_eq!(m.get(Property::Composer), None);
        assert_eq!(m.get(Property::TrackNumber), Some(&MetaValue::Integer(3)));
    }
}
