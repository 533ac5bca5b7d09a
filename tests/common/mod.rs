#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use romkit::ByteSource;
use romkit::file::{Backing, MemBacking};

/// 128-byte NSF header with load/init/play at 0x8000/0x8010/0x8020.
pub fn nsf() -> Vec<u8> {
    let mut b = vec![0u8; 0x80];
    b[..6].copy_from_slice(b"NESM\x1A\x01");
    b[6] = 3;
    b[7] = 1;
    b[0x08..0x0A].copy_from_slice(&0x8000u16.to_le_bytes());
    b[0x0A..0x0C].copy_from_slice(&0x8010u16.to_le_bytes());
    b[0x0C..0x0E].copy_from_slice(&0x8020u16.to_le_bytes());
    b[0x0E..0x0E + 10].copy_from_slice(b"Underworld");
    b[0x2E..0x2E + 7].copy_from_slice(b"Someone");
    b[0x4E..0x4E + 4].copy_from_slice(b"1986");
    b
}

fn be32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// XDBF with an English string table (`title` as id 0x8000) and an XTHD.
///
/// With `bad_length`, the title string's declared length runs past the
/// end of its table.
pub fn xdbf(title: &str, bad_length: bool) -> Vec<u8> {
    let mut xstr = b"XSTR".to_vec();
    be32(&mut xstr, 1);
    be32(&mut xstr, 4 + 2 + 4 + title.len() as u32);
    xstr.extend_from_slice(&1u16.to_be_bytes());
    xstr.extend_from_slice(&0x8000u16.to_be_bytes());
    let len = if bad_length { 0x7FFF } else { title.len() as u16 };
    xstr.extend_from_slice(&len.to_be_bytes());
    xstr.extend_from_slice(title.as_bytes());

    let mut xthd = b"XTHD".to_vec();
    for v in [1, 0x24, 0x4D53_0001, 1] {
        be32(&mut xthd, v);
    }
    xthd.resize(0x2C, 0);

    let resources: [(u16, u64, &[u8]); 2] = [
        (3, 1, &xstr),
        (1, u32::from_be_bytes(*b"XTHD") as u64, &xthd),
    ];

    let mut out = b"XDBF".to_vec();
    be32(&mut out, 0x10000);
    be32(&mut out, 2);
    be32(&mut out, 2);
    be32(&mut out, 0);
    be32(&mut out, 0);
    let mut data = Vec::new();
    for (ns, id, payload) in resources {
        out.extend_from_slice(&ns.to_be_bytes());
        out.extend_from_slice(&id.to_be_bytes());
        be32(&mut out, data.len() as u32);
        be32(&mut out, payload.len() as u32);
        data.extend_from_slice(payload);
    }
    out.extend_from_slice(&data);
    out
}

/// A backing that counts how many times it is dropped.
pub struct DropCounting {
    inner: MemBacking,
    drops: Arc<AtomicUsize>,
}

impl Drop for DropCounting {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl Backing for DropCounting {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_at(pos, buf)
    }
    fn write_at(&self, pos: u64, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_at(pos, buf)
    }
    fn len(&self) -> io::Result<u64> {
        self.inner.len()
    }
    fn set_len(&self, len: u64) -> io::Result<()> {
        self.inner.set_len(len)
    }
    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }
}

pub fn counted(data: Vec<u8>) -> (ByteSource, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let backing = DropCounting {
        inner: MemBacking::new(data, false),
        drops: Arc::clone(&drops),
    };
    (ByteSource::from_backing(Arc::new(backing)), drops)
}
