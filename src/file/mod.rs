//! Shareable, seekable byte sources.
//!
//! A [`ByteSource`] is one *handle* onto a shared [`Backing`]. Each handle
//! carries its own position and last-error slot; the backing is reference
//! counted and released exactly once, when its last handle (including any
//! sub-range view) is dropped.
//!
//! ```text
//!  ByteSource (pos=0x10) ─┐
//!  ByteSource (pos=0x80) ─┼──► Arc<dyn Backing> ──► file / Vec<u8> / host stream
//!  sub_range(0x400, 0x20)─┘      (strong count = live handles)
//! ```
//!
//! ## Semantics
//! * `read` at end-of-data returns `Ok(0)`; a short read is never an error
//!   by itself. Use [`ByteSource::read_exact_at`] when a structure needs
//!   every byte.
//! * Seeking past the end of a root source is legal (a later write extends
//!   it); reading from there fails with [`Error::InvalidRange`].
//! * Sub-range views map `[0, len)` onto `[base, base + len)` of the parent.
//!   Seeks past `len` fail with [`Error::OutOfWindow`], writes are clipped to
//!   the window, and `truncate` is rejected.
//! * Handles are `Send`. Positional state is per handle and not meant to be
//!   shared between threads; open another handle with
//!   [`ByteSource::acquire`] instead.

mod backing;
mod tracker;

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

pub use backing::{Backing, FileBacking, MemBacking};
pub use tracker::RefTracker;
pub(crate) use tracker::TrackerGuard;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    base: u64,
    len: u64,
}

/// One handle onto a shared byte resource.
pub struct ByteSource {
    backing: Arc<dyn Backing>,
    window: Option<Window>,
    pos: u64,
    last_error: Option<io::ErrorKind>,
    guard: Option<TrackerGuard>,
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("window", &self.window)
            .field("pos", &self.pos)
            .field("last_error", &self.last_error)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl ByteSource {
    /// Wrap an externally supplied backing.
    pub fn from_backing(backing: Arc<dyn Backing>) -> Self {
        Self {
            backing,
            window: None,
            pos: 0,
            last_error: None,
            guard: None,
        }
    }

    /// Writable in-memory source owning `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self::from_backing(Arc::new(MemBacking::new(data, true)))
    }

    /// Read-only in-memory copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_backing(Arc::new(MemBacking::new(data.to_vec(), false)))
    }

    /// Open an existing file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_backing(Arc::new(FileBacking::new(file, false))))
    }

    /// Create (or truncate) a file for reading and writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        Ok(Self::from_backing(Arc::new(FileBacking::new(file, true))))
    }

    /// Count this handle, and every handle derived from it, in `tracker`.
    pub fn tracked(mut self, tracker: &RefTracker) -> Self {
        self.guard = Some(tracker.guard());
        self
    }

    pub(crate) fn tracker(&self) -> Option<&RefTracker> {
        self.guard.as_ref().map(TrackerGuard::tracker)
    }

    /// Take another reference to the same resource.
    ///
    /// The new handle covers the same window, starts at position 0, and has
    /// its own cursor.
    pub fn acquire(&self) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            window: self.window,
            pos: 0,
            last_error: None,
            guard: self.guard.clone(),
        }
    }

    /// Drop this reference. The resource is released with the last one.
    pub fn release(self) {
        log::trace!("releasing byte source handle ({} live)", self.ref_count() - 1);
    }

    /// Number of live handles (including sub-range views) on the resource.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.backing)
    }

    /// Whether this handle is a sub-range view.
    pub fn is_sub_range(&self) -> bool {
        self.window.is_some()
    }

    /// Whether writes and truncation can succeed.
    pub fn is_writable(&self) -> bool {
        self.backing.is_writable()
    }

    /// Size of the visible data in bytes.
    pub fn size(&self) -> Result<u64> {
        match self.window {
            Some(w) => Ok(w.len),
            None => Ok(self.backing.len()?),
        }
    }

    /// Current position.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Move to absolute position `pos`.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        let r = match self.window {
            Some(w) if pos > w.len => Err(Error::OutOfWindow),
            _ => {
                self.pos = pos;
                Ok(())
            }
        };
        self.note(r)
    }

    /// Read up to `buf.len()` bytes from the current position.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let r = self.read_inner(buf);
        self.note(r)
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        let size = self.size()?;
        if self.pos > size {
            return Err(Error::InvalidRange);
        }
        let want = (size - self.pos).min(buf.len() as u64) as usize;
        let base = self.window.map_or(0, |w| w.base);

        let mut total = 0;
        while total < want {
            let at = base + self.pos + total as u64;
            let n = self.backing.read_at(at, &mut buf[total..want])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        self.pos += total as u64;
        Ok(total)
    }

    /// Seek to `pos`, then read.
    pub fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.seek(pos)?;
        self.read(buf)
    }

    /// Read exactly `buf.len()` bytes at `pos`.
    ///
    /// Returns [`Error::Truncated`] if fewer bytes exist.
    pub fn read_exact_at(&mut self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let size = self.size()?;
        let n = if pos > size { 0 } else { self.read_at(pos, buf)? };
        if n < buf.len() {
            let e = Error::Truncated {
                offset: pos,
                needed: buf.len(),
                available: n,
            };
            return self.note(Err(e));
        }
        Ok(())
    }

    /// Read everything visible through this handle, from position 0.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = usize::try_from(self.size()?).map_err(|_| Error::InvalidRange)?;
        let mut buf = vec![0u8; size];
        self.read_exact_at(0, &mut buf)?;
        Ok(buf)
    }

    /// Write at the current position.
    ///
    /// Root sources grow as needed; sub-range views clip to their window.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let r = self.write_inner(buf);
        self.note(r)
    }

    fn write_inner(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.backing.is_writable() {
            return Err(Error::ReadOnly);
        }
        let (at, len) = match self.window {
            Some(w) => {
                let room = w.len.saturating_sub(self.pos);
                (w.base + self.pos, room.min(buf.len() as u64) as usize)
            }
            None => (self.pos, buf.len()),
        };
        let n = self.backing.write_at(at, &buf[..len])?;
        self.pos += n as u64;
        Ok(n)
    }

    /// Resize a root source. Clamps the position to the new size.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let r = if self.window.is_some() || !self.backing.is_writable() {
            Err(Error::ReadOnly)
        } else {
            self.backing.set_len(len).map_err(Error::from)
        };
        if r.is_ok() {
            self.pos = self.pos.min(len);
        }
        self.note(r)
    }

    /// A view of `[offset, offset + len)` of this handle's data.
    ///
    /// The view holds its own reference on the resource and stays readable
    /// after this handle is released.
    pub fn sub_range(&self, offset: u64, len: u64) -> Result<ByteSource> {
        let end = offset.checked_add(len).ok_or(Error::InvalidRange)?;
        if end > self.size()? {
            return Err(Error::InvalidRange);
        }
        let base = self.window.map_or(0, |w| w.base) + offset;
        log::trace!("sub-range view at {base:#x}, {len:#x} bytes");
        Ok(Self {
            backing: Arc::clone(&self.backing),
            window: Some(Window { base, len }),
            pos: 0,
            last_error: None,
            guard: self.guard.clone(),
        })
    }

    /// Read one byte. [`None`] at end of data or on error.
    pub fn getc(&mut self) -> Option<u8> {
        let mut b = [0u8; 1];
        match self.read(&mut b) {
            Ok(1) => Some(b[0]),
            _ => None,
        }
    }

    /// Step back one byte.
    pub fn ungetc(&mut self) -> Result<()> {
        if self.pos == 0 {
            return self.note(Err(Error::InvalidRange));
        }
        self.seek(self.pos - 1)
    }

    /// Kind of the last failed operation on this handle.
    pub fn last_error(&self) -> Option<io::ErrorKind> {
        self.last_error
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn note<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(e) = &r {
            self.last_error = Some(error_kind(e));
        }
        r
    }
}

fn error_kind(e: &Error) -> io::ErrorKind {
    match e {
        Error::Io(e) => e.kind(),
        Error::Truncated { .. } => io::ErrorKind::UnexpectedEof,
        Error::OutOfWindow | Error::InvalidRange => io::ErrorKind::InvalidInput,
        Error::ReadOnly => io::ErrorKind::PermissionDenied,
        _ => io::ErrorKind::Other,
    }
}

fn into_io(e: Error) -> io::Error {
    match e {
        Error::Io(e) => e,
        other => io::Error::new(error_kind(&other), other),
    }
}

impl Read for ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        ByteSource::read(self, buf).map_err(into_io)
    }
}

impl Write for ByteSource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ByteSource::write(self, buf).map_err(into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ByteSource {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
            SeekFrom::End(d) => self.size().map_err(into_io)?.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        ByteSource::seek(self, target).map_err(into_io)?;
        Ok(target)
    }
}
