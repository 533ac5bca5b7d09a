//! Format registration and detection.
//!
//! A [`FormatDescriptor`] is pure data: how to recognize a format (magic
//! signatures, minimum size, extensions, optional extra check) plus the
//! function that opens it. A [`Registry`] is an append-only list of
//! descriptors; detection walks it and returns the first match.
//!
//! ## Detection order
//! Candidates are tried in this order, and the first one that matches wins:
//!
//! 1. Descriptors whose extension list accepts the hint, in registration
//!    order.
//! 2. All remaining descriptors, in registration order.
//!
//! The extension hint only reorders. It never makes a descriptor with
//! authoritative magic match when its signature is absent. A file shorter
//! than a descriptor's `min_size` never matches that descriptor.

use std::fmt;
use std::sync::OnceLock;

use crate::Result;
use crate::decode::{ByteOrder, Magic};
use crate::file::ByteSource;
use crate::formats;
use crate::romdata::FormatReader;

/// Bytes read from the start of a file for detection, unless a registered
/// magic lies further in.
pub const DEFAULT_PROBE_LEN: usize = 0x1000;

/// Upper bound on the detection read.
pub const MAX_PROBE_LEN: usize = 0x10000;

/// Broad classification of a recognized file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Unknown,
    RomImage,
    DiscImage,
    AudioFile,
    ResourceLibrary,
    SaveFile,
}

/// What detection knows about a file.
#[derive(Debug, Clone, Copy)]
pub struct DetectInfo<'a> {
    /// The first bytes of the file (possibly fewer than requested).
    pub header: &'a [u8],
    /// Total file size.
    pub size: u64,
    /// Filename or extension hint, if the caller has one.
    pub ext: Option<&'a str>,
}

/// Open a matched file: validate the mandatory header and return the
/// reader that will populate fields on demand.
pub type OpenFn = fn(&mut ByteSource, &DetectInfo<'_>) -> Result<Box<dyn FormatReader>>;

/// Extra detection check run after the magic and size tests pass.
pub type VerifyFn = fn(&DetectInfo<'_>) -> bool;

/// Declarative description of one supported format.
#[derive(Clone, Copy)]
pub struct FormatDescriptor {
    /// Short format name, e.g. `"NSF"`.
    pub name: &'static str,
    /// Human-readable system or format name.
    pub system: &'static str,
    pub file_type: FileType,
    pub byte_order: ByteOrder,
    /// Accepted signatures; any one may match. Empty = extension-only.
    pub magic: &'static [Magic],
    /// Files smaller than this never match.
    pub min_size: u64,
    /// Extensions with the leading dot, lowercase.
    pub extensions: &'static [&'static str],
    /// When set, a missing magic is never excused by a matching extension.
    pub magic_authoritative: bool,
    pub verify: Option<VerifyFn>,
    pub open: OpenFn,
}

impl fmt::Debug for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatDescriptor")
            .field("name", &self.name)
            .field("file_type", &self.file_type)
            .field("min_size", &self.min_size)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FormatDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl FormatDescriptor {
    /// Whether `hint` (a bare extension or a whole filename) ends in one of
    /// this format's extensions. Case-insensitive.
    pub fn accepts_extension(&self, hint: &str) -> bool {
        let mut h = hint.to_ascii_lowercase();
        if !h.contains('.') {
            h.insert(0, '.');
        }
        self.extensions.iter().any(|e| h.ends_with(e))
    }

    fn probe_end(&self) -> usize {
        self.magic.iter().map(Magic::end).max().unwrap_or(0)
    }

    /// Whether this descriptor claims the file described by `info`.
    pub fn matches(&self, info: &DetectInfo<'_>) -> bool {
        if info.size < self.min_size {
            return false;
        }
        let magic_ok = self.magic.iter().any(|m| m.matches(info.header));
        let ext_ok = info.ext.is_some_and(|e| self.accepts_extension(e));
        let claimed = if self.magic.is_empty() {
            ext_ok
        } else if self.magic_authoritative {
            magic_ok
        } else {
            magic_ok || ext_ok
        };
        claimed && self.verify.is_none_or(|v| v(info))
    }
}

/// The detection inputs read from a byte source.
#[derive(Debug, Clone)]
pub struct Probe {
    pub header: Vec<u8>,
    pub size: u64,
    pub ext: Option<String>,
}

impl Probe {
    pub fn info(&self) -> DetectInfo<'_> {
        DetectInfo {
            header: &self.header,
            size: self.size,
            ext: self.ext.as_deref(),
        }
    }
}

/// Append-only list of format descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    formats: Vec<FormatDescriptor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh registry holding every format shipped with the crate, in
    /// the documented order.
    pub fn with_builtin_formats() -> Self {
        let mut r = Self::new();
        for d in formats::BUILTIN {
            r.register(*d);
        }
        r
    }

    /// The process-wide built-in registry, created on first use.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(Registry::with_builtin_formats)
    }

    /// Append a descriptor. Later registrations lose ties.
    pub fn register(&mut self, descriptor: FormatDescriptor) {
        log::debug!("registered format {} at priority {}", descriptor.name, self.formats.len());
        self.formats.push(descriptor);
    }

    /// Descriptors in registration order.
    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Look up a descriptor by its short name.
    pub fn get(&self, name: &str) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|d| d.name == name)
    }

    /// Every extension any registered format accepts, deduplicated.
    pub fn all_extensions(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for &e in self.formats.iter().flat_map(|d| d.extensions) {
            if !out.contains(&e) {
                out.push(e);
            }
        }
        out
    }

    /// Number of leading bytes detection needs.
    pub fn probe_len(&self) -> usize {
        self.formats
            .iter()
            .map(FormatDescriptor::probe_end)
            .fold(DEFAULT_PROBE_LEN, usize::max)
            .min(MAX_PROBE_LEN)
    }

    /// Read the detection inputs from `src`. Leaves `src` positioned at 0.
    pub fn probe(&self, src: &mut ByteSource, ext: Option<&str>) -> Result<Probe> {
        let size = src.size()?;
        let want = (self.probe_len() as u64).min(size) as usize;
        let mut header = vec![0u8; want];
        let n = src.read_at(0, &mut header)?;
        header.truncate(n);
        src.seek(0)?;
        Ok(Probe {
            header,
            size,
            ext: ext.map(str::to_owned),
        })
    }

    /// Pick the descriptor for `info`, or [`None`] if nothing matches.
    pub fn detect_info(&self, info: &DetectInfo<'_>) -> Option<&FormatDescriptor> {
        let promoted = |d: &FormatDescriptor| info.ext.is_some_and(|e| d.accepts_extension(e));
        let found = self
            .formats
            .iter()
            .filter(|d| promoted(*d))
            .chain(self.formats.iter().filter(|d| !promoted(*d)))
            .find(|d| d.matches(info));
        match found {
            Some(d) => log::debug!("detected {} ({} bytes)", d.name, info.size),
            None => log::debug!("no format matched ({} bytes, hint {:?})", info.size, info.ext),
        }
        found
    }

    /// Probe `src` and pick its descriptor.
    ///
    /// An unrecognized file is `Ok(None)`; only I/O failures are errors.
    pub fn detect(
        &self,
        src: &mut ByteSource,
        ext: Option<&str>,
    ) -> Result<Option<&FormatDescriptor>> {
        let probe = self.probe(src, ext)?;
        Ok(self.detect_info(&probe.info()))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::romdata::LoadContext;

    #[derive(Debug)]
    struct Nothing;

    impl FormatReader for Nothing {
        fn load(&self, _ctx: &mut LoadContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn open_nothing(
        _src: &mut ByteSource,
        _info: &DetectInfo<'_>,
    ) -> Result<Box<dyn FormatReader>> {
        Ok(Box::new(Nothing))
    }

    const fn desc(
        name: &'static str,
        magic: &'static [Magic],
        min_size: u64,
        extensions: &'static [&'static str],
        magic_authoritative: bool,
    ) -> FormatDescriptor {
        FormatDescriptor {
            name,
            system: name,
            file_type: FileType::RomImage,
            byte_order: ByteOrder::Little,
            magic,
            min_size,
            extensions,
            magic_authoritative,
            verify: None,
            open: open_nothing,
        }
    }

    const AAAA: FormatDescriptor = desc("AAAA", &[Magic::new(0, b"AAAA")], 4, &[".aaa"], true);
    const BBBB: FormatDescriptor = desc("BBBB", &[Magic::new(0, b"BBBB")], 4, &[".bbb"], true);
    const AA: FormatDescriptor = desc("AA", &[Magic::new(0, b"AA")], 2, &[".aa"], true);
    const BIG: FormatDescriptor = desc("BIG", &[Magic::new(0, b"AAAA")], 0x100, &[], true);
    const LOOSE: FormatDescriptor = desc("LOOSE", &[Magic::new(4, b"ZZ")], 0, &[".lse"], false);
    const EXT_ONLY: FormatDescriptor = desc("EXT", &[], 0, &[".ext"], false);

    fn info<'a>(header: &'a [u8], ext: Option<&'a str>) -> DetectInfo<'a> {
        DetectInfo {
            header,
            size: header.len() as u64,
            ext,
        }
    }

    fn registry(ds: &[FormatDescriptor]) -> Registry {
        let mut r = Registry::new();
        for d in ds {
            r.register(*d);
        }
        r
    }

    #[test]
    fn extension_hint_never_overrides_authoritative_magic() {
        let r = registry(&[AAAA, BBBB]);
        let data = b"AAAAxxxx";
        let found = r.detect_info(&info(data, Some("game.bbb"))).map(|d| d.name);
        assert_eq!(found, Some("AAAA"));
        assert!(r.detect_info(&info(b"CCCCxxxx", Some(".aaa"))).is_none());
    }

    #[test]
    fn ties_go_to_registration_order() {
        let forward = registry(&[AAAA, AA]);
        let backward = registry(&[AA, AAAA]);
        let data = b"AAAAAAAA";
        assert_eq!(forward.detect_info(&info(data, None)).map(|d| d.name), Some("AAAA"));
        assert_eq!(backward.detect_info(&info(data, None)).map(|d| d.name), Some("AA"));
    }

    #[test]
    fn extension_promotes_among_matches() {
        let r = registry(&[AAAA, AA]);
        let data = b"AAAAAAAA";
        assert_eq!(r.detect_info(&info(data, Some("x.aa"))).map(|d| d.name), Some("AA"));
        assert_eq!(r.detect_info(&info(data, Some("X.AAA"))).map(|d| d.name), Some("AAAA"));
    }

    #[test]
    fn min_size_excludes_even_with_magic() {
        let r = registry(&[BIG]);
        assert!(r.detect_info(&info(b"AAAA", None)).is_none());
        let mut big = b"AAAA".to_vec();
        big.resize(0x100, 0);
        assert_eq!(r.detect_info(&info(&big, None)).map(|d| d.name), Some("BIG"));
    }

    #[test]
    fn non_authoritative_formats_accept_extension() {
        let r = registry(&[LOOSE, EXT_ONLY]);
        assert_eq!(r.detect_info(&info(b"....ZZ", None)).map(|d| d.name), Some("LOOSE"));
        assert_eq!(r.detect_info(&info(b"", Some("lse"))).map(|d| d.name), Some("LOOSE"));
        assert_eq!(r.detect_info(&info(b"", Some("a.ext"))).map(|d| d.name), Some("EXT"));
        assert!(r.detect_info(&info(b"", None)).is_none());
    }

    #[test]
    fn detect_reads_from_source() {
        let r = registry(&[AAAA]);
        let mut src = ByteSource::from_slice(b"AAAA1234");
        src.seek(6).unwrap();
        assert_eq!(r.detect(&mut src, None).unwrap().map(|d| d.name), Some("AAAA"));
        assert_eq!(src.tell(), 0);
        let mut empty = ByteSource::from_slice(&[]);
        assert!(r.detect(&mut empty, None).unwrap().is_none());
    }

    #[test]
    fn builtin_registry_is_shared_and_ordered() {
        let a = Registry::builtin();
        let b = Registry::builtin();
        assert!(std::ptr::eq(a, b));
        let names: Vec<_> = a.formats().iter().map(|d| d.name).collect();
        assert_eq!(names, ["NSF", "XDBF", "NASOS", "WiiU"]);
        assert!(a.all_extensions().contains(&".nsf"));
        assert!(a.probe_len() >= DEFAULT_PROBE_LEN);
    }

    proptest! {
        #[test]
        fn disjoint_magic_wins_regardless_of_hint(
            tail in proptest::collection::vec(any::<u8>(), 0..32),
            hint in prop::option::of(prop::sample::select(vec![
                "a.aaa", "b.bbb", "c.aa", "", "noext",
            ])),
        ) {
            let r = registry(&[AAAA, BBBB]);
            let mut data = b"BBBB".to_vec();
            data.extend_from_slice(&tail);
            let found = r.detect_info(&info(&data, hint)).map(|d| d.name);
            prop_assert_eq!(found, Some("BBBB"));
        }

        #[test]
        fn detection_is_deterministic(
            data in proptest::collection::vec(prop::sample::select(vec![b'A', b'B']), 0..8),
        ) {
            let r = registry(&[AAAA, BBBB, AA, BIG]);
            let first = r.detect_info(&info(&data, None)).map(|d| d.name);
            for _ in 0..4 {
                prop_assert_eq!(r.detect_info(&info(&data, None)).map(|d| d.name), first);
            }
        }
    }
}
