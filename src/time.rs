//! Timestamp helpers for header date fields.
//!
//! None of the built-in formats store dates; these are for readers
//! registered by downstream crates, whose results go into
//! [`crate::fields::FieldModel::add_datetime`].

use chrono::{DateTime, NaiveDate, Utc};

/// Parse an ASCII `YYYYMMDD` release date (Saturn, Dreamcast, ...).
///
/// Returns [`None`] for non-digits or an impossible calendar date.
pub fn ascii_yyyymmdd_to_utc(ascii: &[u8; 8]) -> Option<DateTime<Utc>> {
    let mut n = [0u32; 8];
    for (d, &c) in n.iter_mut().zip(ascii) {
        if !c.is_ascii_digit() {
            return None;
        }
        *d = (c - b'0') as u32;
    }
    let year = n[0] * 1000 + n[1] * 100 + n[2] * 10 + n[3];
    let month = n[4] * 10 + n[5];
    let day = n[6] * 10 + n[7];
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn bcd(b: u8) -> Option<u32> {
    let (hi, lo) = (b >> 4, b & 0x0F);
    (hi <= 9 && lo <= 9).then_some((hi * 10 + lo) as u32)
}

/// Parse a BCD timestamp: `YY YY MM DD` or `YY YY MM DD HH mm ss`.
///
/// Returns [`None`] for other lengths, non-BCD nibbles or impossible
/// values.
pub fn bcd_to_utc(raw: &[u8]) -> Option<DateTime<Utc>> {
    if raw.len() != 4 && raw.len() != 7 {
        return None;
    }
    let year = bcd(raw[0])? * 100 + bcd(raw[1])?;
    let date = NaiveDate::from_ymd_opt(year as i32, bcd(raw[2])?, bcd(raw[3])?)?;
    let (h, m, s) = if raw.len() == 7 {
        (bcd(raw[4])?, bcd(raw[5])?, bcd(raw[6])?)
    } else {
        (0, 0, 0)
    };
    Some(date.and_hms_opt(h, m, s)?.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn ascii_dates() {
        let dt = ascii_yyyymmdd_to_utc(b"19981127").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (1998, 11, 27));
        assert!(ascii_yyyymmdd_to_utc(b"1998112 ").is_none());
        assert!(ascii_yyyymmdd_to_utc(b"19981332").is_none());
    }

    #[test]
    fn bcd_dates() {
        let dt = bcd_to_utc(&[0x20, 0x01, 0x09, 0x14]).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2001, 9, 14));

        let dt = bcd_to_utc(&[0x19, 0x96, 0x06, 0x23, 0x13, 0x45, 0x07]).unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (13, 45, 7));

        assert!(bcd_to_utc(&[0x20, 0x01, 0x1A, 0x01]).is_none());
        assert!(bcd_to_utc(&[0x20, 0x01, 0x02]).is_none());
        assert!(bcd_to_utc(&[0x20, 0x01, 0x02, 0x30]).is_none());
    }
}
