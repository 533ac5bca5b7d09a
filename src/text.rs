//! Legacy text decoding.
//!
//! Every function here is total: any input, including an empty one, yields
//! a `String`. Bytes or units a variant does not define decode to U+FFFD
//! rather than failing, and decoding stops at the first NUL, so fixed-width
//! NUL-padded header fields come back without their padding.

use crate::decode::ByteOrder;

/// Single-byte code pages found in console headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Legacy8Bit {
    /// 7-bit ASCII. 0x80..=0xFF are undefined.
    Ascii,
    /// ISO-8859-1. The C1 range 0x80..=0x9F is undefined, since in practice
    /// those bytes are cp1252 punctuation mislabeled as Latin-1.
    Latin1,
    /// Windows-1252.
    Cp1252,
}

/// 0x80..=0x9F in Windows-1252. `None` marks the five unassigned bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

fn decode_byte(b: u8, variant: Legacy8Bit) -> Option<char> {
    match (variant, b) {
        (_, 0x00..=0x7F) => Some(b as char),
        (Legacy8Bit::Ascii, _) => None,
        (Legacy8Bit::Latin1, 0x80..=0x9F) => None,
        (Legacy8Bit::Latin1, _) => Some(b as char),
        (Legacy8Bit::Cp1252, 0x80..=0x9F) => CP1252_HIGH[(b - 0x80) as usize],
        (Legacy8Bit::Cp1252, _) => Some(b as char),
    }
}

fn encode_char(c: char, variant: Legacy8Bit) -> Option<u8> {
    let cp = c as u32;
    match variant {
        _ if cp < 0x80 => Some(cp as u8),
        Legacy8Bit::Ascii => None,
        Legacy8Bit::Latin1 => (0xA0..=0xFF).contains(&cp).then_some(cp as u8),
        Legacy8Bit::Cp1252 => {
            if (0xA0..=0xFF).contains(&cp) {
                return Some(cp as u8);
            }
            CP1252_HIGH
                .iter()
                .position(|&m| m == Some(c))
                .map(|i| 0x80 + i as u8)
        }
    }
}

/// Decode a NUL-terminated or NUL-padded single-byte string.
pub fn decode_legacy_8bit(bytes: &[u8], variant: Legacy8Bit) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end]
        .iter()
        .map(|&b| decode_byte(b, variant).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Encode `s` back into `variant`.
///
/// Returns [`None`] if any character has no mapping (including U+FFFD and
/// NUL, which cannot survive a decode).
pub fn encode_legacy_8bit(s: &str, variant: Legacy8Bit) -> Option<Vec<u8>> {
    s.chars()
        .map(|c| if c == '\0' { None } else { encode_char(c, variant) })
        .collect()
}

/// Byte-swap every UTF-16 unit.
pub fn utf16_bswap(units: &[u16]) -> Vec<u16> {
    units.iter().map(|u| u.swap_bytes()).collect()
}

fn utf16_to_string(units: impl Iterator<Item = u16>) -> String {
    char::decode_utf16(units.take_while(|&u| u != 0))
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Decode UTF-16 units that were loaded from a stream in host order.
///
/// Units are byte-swapped first when `order` is not the host order.
pub fn decode_utf16_units(units: &[u16], order: ByteOrder) -> String {
    if order.is_native() {
        utf16_to_string(units.iter().copied())
    } else {
        utf16_to_string(units.iter().map(|u| u.swap_bytes()))
    }
}

/// Decode UTF-16 stored as raw bytes in `order`. A trailing odd byte is
/// ignored.
pub fn decode_utf16_bytes(bytes: &[u8], order: ByteOrder) -> String {
    utf16_to_string(
        bytes
            .chunks_exact(2)
            .map(|c| order.u16_from([c[0], c[1]])),
    )
}

/// Decode NUL-padded UTF-8, replacing invalid sequences.
pub fn decode_utf8_padded(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
