//! Shared resources behind [`super::ByteSource`] handles.
//!
//! A backing is positional: every call names its absolute offset, so any
//! number of handles (and sub-range views) can share one backing without
//! sharing a cursor. Backings are dropped, and the real resource released,
//! when the last handle referencing them goes away.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use parking_lot::{Mutex, RwLock};

/// Positional storage shared by byte-source handles.
///
/// Implement this to plug an external stream (archive member, network
/// buffer, host-provided stream object) into the engine.
pub trait Backing: Send + Sync {
    /// Read up to `buf.len()` bytes at `pos`. Returns 0 at or past the end.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf` at `pos`, extending the resource if needed.
    fn write_at(&self, pos: u64, buf: &[u8]) -> io::Result<usize>;

    /// Current size in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Resize to exactly `len` bytes.
    fn set_len(&self, len: u64) -> io::Result<()>;

    /// Whether [`Backing::write_at`] and [`Backing::set_len`] are allowed.
    fn is_writable(&self) -> bool;
}

/// In-memory backing.
///
/// Writes and resizes never grow the buffer past `max_len`; an attempt
/// fails with [`io::ErrorKind::InvalidInput`] and leaves the data untouched.
#[derive(Debug)]
pub struct MemBacking {
    data: RwLock<Vec<u8>>,
    writable: bool,
    max_len: usize,
}

impl MemBacking {
    /// Growth limit used by [`MemBacking::new`] (1 GiB).
    pub const DEFAULT_MAX_LEN: usize = 1 << 30;

    pub fn new(data: Vec<u8>, writable: bool) -> Self {
        Self {
            data: RwLock::new(data),
            writable,
            max_len: Self::DEFAULT_MAX_LEN,
        }
    }

    /// Replace the growth limit.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    fn check_growth(&self, current: usize, new_len: usize) -> io::Result<()> {
        if new_len > current && new_len > self.max_len {
            log::debug!(
                "in-memory source would grow to {new_len:#x} bytes, limit {:#x}",
                self.max_len
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "in-memory source size limit exceeded",
            ));
        }
        Ok(())
    }
}

impl Backing for MemBacking {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.read();
        let Ok(start) = usize::try_from(pos) else {
            return Ok(0);
        };
        let Some(avail) = data.get(start..) else {
            return Ok(0);
        };
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        Ok(n)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let start = usize::try_from(pos).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        let mut data = self.data.write();
        self.check_growth(data.len(), end)?;
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        if !self.writable {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let len = usize::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let mut data = self.data.write();
        self.check_growth(data.len(), len)?;
        data.resize(len, 0);
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}

/// Filesystem-backed storage.
///
/// The OS file cursor is private to the backing and only moved under the
/// lock, so handles never observe each other's positions.
#[derive(Debug)]
pub struct FileBacking {
    file: Mutex<File>,
    writable: bool,
}

impl FileBacking {
    pub fn new(file: File, writable: bool) -> Self {
        Self {
            file: Mutex::new(file),
            writable,
        }
    }
}

impl Backing for FileBacking {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        if !self.writable {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        self.file.lock().set_len(len)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }
}
