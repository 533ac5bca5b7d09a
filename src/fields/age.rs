//! Age rating tables.
//!
//! Many headers carry one rating byte per rating board. Readers translate
//! those into [`AgeRating`] values and store them in a fixed 16-slot
//! [`AgeRatings`] table indexed by [`AgeRatingSystem`]. No built-in format
//! carries ratings; the table is filled by downstream readers through
//! [`super::FieldModel::add_age_ratings`].

use std::fmt;

/// Rating boards, by slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AgeRatingSystem {
    Japan = 0,
    Usa = 1,
    Germany = 3,
    Europe = 4,
    Finland = 5,
    Portugal = 6,
    England = 7,
    Australia = 8,
    SouthKorea = 9,
    Taiwan = 10,
}

impl AgeRatingSystem {
    pub const ALL: [AgeRatingSystem; 10] = [
        Self::Japan,
        Self::Usa,
        Self::Germany,
        Self::Europe,
        Self::Finland,
        Self::Portugal,
        Self::England,
        Self::Australia,
        Self::SouthKorea,
        Self::Taiwan,
    ];

    /// Board abbreviation used in displays.
    pub fn abbrev(self) -> &'static str {
        match self {
            Self::Japan => "CERO",
            Self::Usa => "ESRB",
            Self::Germany => "USK",
            Self::Europe => "PEGI",
            Self::Finland => "MEKU",
            Self::Portugal => "PEGI-PT",
            Self::England => "BBFC",
            Self::Australia => "ACB",
            Self::SouthKorea => "GRB",
            Self::Taiwan => "CGSRR",
        }
    }

    fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|s| *s as usize == slot)
    }
}

/// One rating slot, packed the way consoles commonly store it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AgeRating(u16);

impl AgeRating {
    const AGE_MASK: u16 = 0x001F;
    const ONLINE_PLAY: u16 = 0x1000;
    const NO_RESTRICTION: u16 = 0x2000;
    const PROHIBITED: u16 = 0x4000;
    const ACTIVE: u16 = 0x8000;

    /// An active rating with minimum age `age` (clamped to 31).
    pub fn age(age: u8) -> Self {
        Self(Self::ACTIVE | (age as u16).min(Self::AGE_MASK))
    }

    pub fn no_restriction() -> Self {
        Self(Self::ACTIVE | Self::NO_RESTRICTION)
    }

    pub fn prohibited() -> Self {
        Self(Self::ACTIVE | Self::PROHIBITED)
    }

    /// Mark the rating as covering online interactions.
    pub fn with_online_play(self) -> Self {
        Self(self.0 | Self::ONLINE_PLAY)
    }

    pub fn is_active(self) -> bool {
        self.0 & Self::ACTIVE != 0
    }

    pub fn min_age(self) -> u8 {
        (self.0 & Self::AGE_MASK) as u8
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for AgeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 & Self::PROHIBITED != 0 {
            f.write_str("No")?;
        } else if self.0 & Self::NO_RESTRICTION != 0 {
            f.write_str("All")?;
        } else {
            write!(f, "{}", self.min_age())?;
        }
        if self.0 & Self::ONLINE_PLAY != 0 {
            f.write_str("\u{00B0}")?;
        }
        Ok(())
    }
}

/// Ratings for every board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AgeRatings([AgeRating; 16]);

impl AgeRatings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, system: AgeRatingSystem, rating: AgeRating) {
        self.0[system as usize] = rating;
    }

    pub fn get(&self, system: AgeRatingSystem) -> AgeRating {
        self.0[system as usize]
    }

    /// Active ratings in slot order.
    pub fn active(&self) -> impl Iterator<Item = (AgeRatingSystem, AgeRating)> + '_ {
        self.0.iter().enumerate().filter_map(|(slot, r)| {
            let system = AgeRatingSystem::from_slot(slot)?;
            r.is_active().then_some((system, *r))
        })
    }
}

impl fmt::Display for AgeRatings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut any = false;
        for (system, rating) in self.active() {
            if any {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", system.abbrev(), rating)?;
            any = true;
        }
        if !any {
            f.write_str("None")?;
        }
        Ok(())
    }
}
