//! The per-file metadata engine.
//!
//! A [`RomData`] binds one [`ByteSource`] to the format detected for it.
//! Construction runs detection and decodes the mandatory header; the
//! presentation fields and metadata are populated lazily, exactly once, on
//! first access.
//!
//! ```text
//!  new() ──► detect ──► no match ─────────────► Unrecognized
//!              ├─► read error ────────────────► Invalid (TopLevelInvalid)
//!              │
//!              └─► open header ──► Err ───────► Invalid (TopLevelInvalid)
//!                      │
//!                      └─► Ok ──► FieldsPending ──► fields() ──► FieldsLoaded
//! ```
//!
//! Handles are shared: [`RomData::acquire`] returns another handle to the
//! same engine and the engine (with its byte source) is released when the
//! last handle is dropped.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::fields::{FieldModel, MetaData};
use crate::file::{ByteSource, RefTracker, TrackerGuard};
use crate::registry::{FileType, FormatDescriptor, Registry};
use crate::{Error, Result};

/// Format-specific half of an engine, produced by a descriptor's `open`.
///
/// `open` has already validated the mandatory header; `load` turns the file
/// into fields and metadata. Optional sub-records that fail to decode go
/// through [`LoadContext::optional`] so the rest of the file still loads.
pub trait FormatReader: Send + Sync + fmt::Debug {
    fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()>;

    /// Refine the descriptor's file type after looking at the header.
    fn file_type(&self) -> Option<FileType> {
        None
    }
}

/// An optional sub-record that was skipped.
#[derive(Debug)]
pub struct Degradation {
    /// The error, wrapped as [`Error::SubRecordInvalid`].
    pub error: Error,
}

impl Degradation {
    /// Name of the skipped sub-record.
    pub fn record(&self) -> &'static str {
        match &self.error {
            Error::SubRecordInvalid { record, .. } => record,
            _ => "unknown",
        }
    }
}

/// Everything a [`FormatReader`] works with while loading.
#[derive(Debug)]
pub struct LoadContext<'a> {
    pub src: &'a mut ByteSource,
    pub fields: FieldModel,
    pub metadata: MetaData,
    format: &'static str,
    degradations: Vec<Degradation>,
}

impl<'a> LoadContext<'a> {
    pub fn new(src: &'a mut ByteSource, format: &'static str) -> Self {
        Self {
            src,
            fields: FieldModel::new(),
            metadata: MetaData::new(),
            format,
            degradations: Vec::new(),
        }
    }

    /// Record a skipped sub-record.
    pub fn degrade(&mut self, record: &'static str, err: Error) {
        let error = match err {
            e @ Error::SubRecordInvalid { .. } => e,
            e => e.into_sub_record(record),
        };
        log::warn!("{}: {error}", self.format);
        self.degradations.push(Degradation { error });
    }

    /// Unwrap an optional sub-record, degrading on failure.
    pub fn optional<T>(&mut self, record: &'static str, res: Result<T>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(e) => {
                self.degrade(record, e);
                None
            }
        }
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

/// Construction options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Formats to detect against. Defaults to [`Registry::builtin`].
    pub registry: Option<Arc<Registry>>,
    /// Counts live engine handles.
    pub tracker: Option<RefTracker>,
    /// Largest source the `compression` feature will expand into memory.
    /// Bigger streams are detected as-is.
    pub max_decompressed_size: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            registry: None,
            tracker: None,
            max_decompressed_size: crate::compression::DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Detection found no format.
    Unrecognized,
    /// Detection could not read the source, or a format matched but its
    /// header (or load) failed.
    Invalid,
    FieldsPending,
    FieldsLoaded,
}

#[derive(Debug, Default)]
struct Loaded {
    fields: FieldModel,
    metadata: MetaData,
    degradations: Vec<Degradation>,
    error: Option<Error>,
}

#[derive(Debug)]
struct Inner {
    source: Mutex<ByteSource>,
    format: Option<FormatDescriptor>,
    reader: Option<Box<dyn FormatReader>>,
    header_error: Option<Error>,
    loaded: OnceLock<Loaded>,
}

impl Inner {
    fn load(&self) -> Loaded {
        let (Some(desc), Some(reader)) = (&self.format, &self.reader) else {
            return Loaded::default();
        };
        let mut src = self.source.lock();
        let mut ctx = LoadContext::new(&mut src, desc.name);
        match reader.load(&mut ctx) {
            Ok(()) => {
                log::debug!(
                    "{}: loaded {} fields, {} metadata entries, {} degraded",
                    desc.name,
                    ctx.fields.len(),
                    ctx.metadata.len(),
                    ctx.degradations.len()
                );
                Loaded {
                    fields: ctx.fields,
                    metadata: ctx.metadata,
                    degradations: ctx.degradations,
                    error: None,
                }
            }
            Err(e) => {
                let e = e.into_top_level(desc.name);
                log::warn!("{e}");
                Loaded {
                    error: Some(e),
                    ..Loaded::default()
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        log::trace!(
            "releasing engine for {}",
            self.format.map_or("unrecognized file", |d| d.name)
        );
    }
}

/// Shared handle onto one file's metadata engine.
#[derive(Debug)]
pub struct RomData {
    inner: Arc<Inner>,
    guard: Option<TrackerGuard>,
}

impl RomData {
    /// Detect `source` against the built-in registry.
    ///
    /// `hint` is a filename or extension. It only reorders detection.
    pub fn new(source: ByteSource, hint: Option<&str>) -> Self {
        Self::with_options(source, hint, Options::default())
    }

    /// Open a file from disk, using its name as the extension hint.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = ByteSource::open(path)?;
        let hint = path.file_name().and_then(|n| n.to_str());
        Ok(Self::new(source, hint))
    }

    pub fn with_options(source: ByteSource, hint: Option<&str>, options: Options) -> Self {
        #[cfg(feature = "compression")]
        let source = {
            let mut source = source;
            let limit = options.max_decompressed_size;
            match crate::compression::decompress_source(&mut source, limit) {
                Ok(Some(plain)) => plain,
                Ok(None) => source,
                Err(e) => {
                    log::warn!("compressed source could not be expanded: {e}");
                    source
                }
            }
        };
        let registry = options.registry.as_deref().unwrap_or(Registry::builtin());
        let inner = Self::detect(source, hint, registry);
        Self {
            inner: Arc::new(inner),
            guard: options.tracker.as_ref().map(RefTracker::guard),
        }
    }

    fn detect(mut source: ByteSource, hint: Option<&str>, registry: &Registry) -> Inner {
        let mut format = None;
        let mut reader = None;
        let mut header_error = None;
        match registry.probe(&mut source, hint) {
            Ok(probe) => {
                let info = probe.info();
                if let Some(desc) = registry.detect_info(&info).copied() {
                    match (desc.open)(&mut source, &info) {
                        Ok(r) => reader = Some(r),
                        Err(e) => {
                            let e = e.into_top_level(desc.name);
                            log::debug!("{e}");
                            header_error = Some(e);
                        }
                    }
                    format = Some(desc);
                }
            }
            Err(e) => {
                let e = e.into_top_level("detection");
                log::warn!("{e}");
                header_error = Some(e);
            }
        }
        if let Err(e) = source.seek(0) {
            log::trace!("rewind after detection failed: {e}");
        }
        Inner {
            source: Mutex::new(source),
            format,
            reader,
            header_error,
            loaded: OnceLock::new(),
        }
    }

    fn loaded(&self) -> &Loaded {
        self.inner.loaded.get_or_init(|| self.inner.load())
    }

    /// Whether a format matched.
    pub fn is_recognized(&self) -> bool {
        self.inner.format.is_some()
    }

    /// Whether a format matched and its data decoded.
    ///
    /// Starts out reflecting the header. If a later lazy load fails the
    /// instance turns invalid.
    pub fn is_valid(&self) -> bool {
        self.inner.reader.is_some()
            && self.inner.loaded.get().is_none_or(|l| l.error.is_none())
    }

    pub fn state(&self) -> State {
        match (self.inner.format, self.inner.loaded.get()) {
            (None, _) if self.inner.header_error.is_some() => State::Invalid,
            (None, _) => State::Unrecognized,
            _ if !self.is_valid() => State::Invalid,
            (Some(_), None) => State::FieldsPending,
            (Some(_), Some(_)) => State::FieldsLoaded,
        }
    }

    /// The matched descriptor.
    pub fn format(&self) -> Option<&FormatDescriptor> {
        self.inner.format.as_ref()
    }

    pub fn format_name(&self) -> Option<&'static str> {
        self.inner.format.map(|d| d.name)
    }

    pub fn system_name(&self) -> Option<&'static str> {
        self.inner.format.map(|d| d.system)
    }

    /// File type, or [`FileType::Unknown`] if not valid.
    pub fn file_type(&self) -> FileType {
        match (&self.inner.format, &self.inner.reader) {
            (Some(desc), Some(reader)) if self.is_valid() => {
                reader.file_type().unwrap_or(desc.file_type)
            }
            _ => FileType::Unknown,
        }
    }

    /// Extensions of the matched format.
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        self.inner.format.map_or(&[], |d| d.extensions)
    }

    /// Presentation fields, loading them on first call.
    ///
    /// Empty for unrecognized or invalid files.
    pub fn fields(&self) -> &FieldModel {
        &self.loaded().fields
    }

    /// Metadata properties, loading them on first call.
    pub fn metadata(&self) -> &MetaData {
        &self.loaded().metadata
    }

    /// Optional sub-records skipped during loading.
    pub fn degradations(&self) -> &[Degradation] {
        &self.loaded().degradations
    }

    /// Why the instance is invalid, if it is. Does not trigger a load.
    pub fn error(&self) -> Option<&Error> {
        self.inner
            .header_error
            .as_ref()
            .or_else(|| self.inner.loaded.get().and_then(|l| l.error.as_ref()))
    }

    /// Another handle onto the same engine.
    pub fn acquire(&self) -> RomData {
        RomData {
            inner: Arc::clone(&self.inner),
            guard: self.guard.clone(),
        }
    }

    /// Give up this handle.
    pub fn release(self) {}

    /// Live handles onto this engine.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// A fresh handle onto the engine's byte source, positioned at 0.
    pub fn source(&self) -> ByteSource {
        self.inner.source.lock().acquire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ByteOrder, Magic};
    use crate::registry::DetectInfo;

    #[derive(Debug)]
    struct TwoRecords;

    impl FormatReader for TwoRecords {
        fn load(&self, ctx: &mut LoadContext<'_>) -> Result<()> {
            let mut b = [0u8; 4];
            ctx.src.read_exact_at(4, &mut b)?;
            ctx.fields.add_string("First", String::from_utf8_lossy(&b));
            let mut extra = [0u8; 4];
            let res = ctx.src.read_exact_at(8, &mut extra);
            if ctx.optional("extra", res).is_some() {
                ctx.fields.add_string("Extra", String::from_utf8_lossy(&extra));
            }
            Ok(())
        }
    }

    fn open_two(src: &mut ByteSource, _info: &DetectInfo<'_>) -> Result<Box<dyn FormatReader>> {
        let mut hdr = [0u8; 2];
        src.read_exact_at(0, &mut hdr)?;
        if hdr[1] == b'!' {
            return Err(Error::Parse("bang"));
        }
        Ok(Box::new(TwoRecords))
    }

    const TEST: FormatDescriptor = FormatDescriptor {
        name: "TEST",
        system: "Test System",
        file_type: FileType::RomImage,
        byte_order: ByteOrder::Little,
        magic: &[Magic::new(0, b"T")],
        min_size: 1,
        extensions: &[".tst"],
        magic_authoritative: true,
        verify: None,
        open: open_two,
    };

    fn options() -> Options {
        let mut r = Registry::new();
        r.register(TEST);
        Options {
            registry: Some(Arc::new(r)),
            tracker: None,
            ..Options::default()
        }
    }

    #[test]
    fn unrecognized_is_empty_and_unknown() {
        let rd = RomData::with_options(ByteSource::from_slice(b"nothing"), None, options());
        assert!(!rd.is_recognized());
        assert!(!rd.is_valid());
        assert_eq!(rd.state(), State::Unrecognized);
        assert_eq!(rd.file_type(), FileType::Unknown);
        assert!(rd.fields().is_empty());
        assert!(rd.error().is_none());
    }

    #[derive(Debug)]
    struct Unreadable;

    impl crate::file::Backing for Unreadable {
        fn read_at(&self, _pos: u64, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("medium error"))
        }
        fn write_at(&self, _pos: u64, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }
        fn len(&self) -> std::io::Result<u64> {
            Ok(0x100)
        }
        fn set_len(&self, _len: u64) -> std::io::Result<()> {
            Err(std::io::ErrorKind::PermissionDenied.into())
        }
        fn is_writable(&self) -> bool {
            false
        }
    }

    #[test]
    fn detection_io_error_is_top_level() {
        let src = ByteSource::from_backing(Arc::new(Unreadable));
        let rd = RomData::with_options(src, Some("x.tst"), options());
        assert!(!rd.is_recognized());
        assert!(!rd.is_valid());
        assert_eq!(rd.state(), State::Invalid);
        let err = rd.error().unwrap();
        assert!(matches!(err, Error::TopLevelInvalid { .. }));
        assert!(matches!(err.root_cause(), Error::Io(_)));
        assert!(rd.fields().is_empty());
        assert_eq!(rd.file_type(), FileType::Unknown);
    }

    #[test]
    fn header_failure_is_top_level() {
        let rd = RomData::with_options(ByteSource::from_slice(b"T!xxxxxx"), None, options());
        assert!(rd.is_recognized());
        assert!(!rd.is_valid());
        assert_eq!(rd.state(), State::Invalid);
        assert!(matches!(rd.error(), Some(Error::TopLevelInvalid { format: "TEST", .. })));
        assert!(rd.fields().is_empty());
        assert_eq!(rd.file_type(), FileType::Unknown);
    }

    #[test]
    fn lazy_load_with_degradation() {
        let rd = RomData::with_options(ByteSource::from_slice(b"T...ABCDEF"), None, options());
        assert_eq!(rd.state(), State::FieldsPending);
        assert_eq!(rd.fields().find("First").and_then(|f| f.as_str()), Some("ABCD"));
        assert!(rd.fields().find("Extra").is_none());
        assert_eq!(rd.state(), State::FieldsLoaded);
        assert_eq!(rd.degradations().len(), 1);
        assert_eq!(rd.degradations()[0].record(), "extra");
        assert!(rd.is_valid());
        assert_eq!(rd.file_type(), FileType::RomImage);
        assert_eq!(rd.system_name(), Some("Test System"));
    }

    #[test]
    fn load_failure_invalidates() {
        let rd = RomData::with_options(ByteSource::from_slice(b"T.."), None, options());
        assert!(rd.is_valid());
        assert!(rd.fields().is_empty());
        assert!(!rd.is_valid());
        assert!(rd.error().is_some_and(Error::is_truncation));
    }

    #[test]
    fn handles_share_one_engine() {
        let tracker = RefTracker::new();
        let mut opts = options();
        opts.tracker = Some(tracker.clone());
        let rd = RomData::with_options(ByteSource::from_slice(b"T...ABCDEFGH"), None, opts);
        let other = rd.acquire();
        assert_eq!(rd.ref_count(), 2);
        assert_eq!(tracker.live(), 2);
        assert_eq!(other.fields().len(), 2);
        assert_eq!(rd.state(), State::FieldsLoaded);
        other.release();
        assert_eq!(rd.ref_count(), 1);
        assert_eq!(tracker.live(), 1);
        drop(rd);
        assert_eq!(tracker.live(), 0);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn oversized_compressed_source_is_detected_raw() {
        let packed = ::zstd::encode_all(&b"T...ABCDEFGH"[..], 3).unwrap();

        let rd = RomData::with_options(ByteSource::from_vec(packed.clone()), None, options());
        assert_eq!(rd.format_name(), Some("TEST"));

        let mut opts = options();
        opts.max_decompressed_size = 8;
        let rd = RomData::with_options(ByteSource::from_vec(packed), None, opts);
        assert!(!rd.is_recognized());
        assert!(rd.error().is_none());
    }

    #[test]
    fn concurrent_first_access_loads_once() {
        let rd = RomData::with_options(ByteSource::from_slice(b"T...ABCDEFGH"), None, options());
        std::thread::scope(|s| {
            for _ in 0..4 {
                let h = rd.acquire();
                s.spawn(move || assert_eq!(h.fields().len(), 2));
            }
        });
        assert_eq!(rd.fields().len(), 2);
    }
}
