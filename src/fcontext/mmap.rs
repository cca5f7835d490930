//! The MMAP pool (§3): memory-mapped regions backing borrowed stem and regex-source
//! bytes loaded from a compiled rule file.
//!
//! The C original tracks regions in a handle-owned singly-linked list and requires the
//! caller to unmap strictly after the last borrowed string referencing a region is
//! freed. Here that discipline is replaced by ownership: every borrowed [`ByteString`]
//! holds an `Rc<MmapRegion>`, so the region is unmapped exactly when its last reference
//! (including the handle's own list, which exists only to keep regions alive even if a
//! future spec stops referencing one) drops — a static guarantee instead of a runtime one.

use std::fs::File;
use std::os::fd::AsFd;
use std::path::Path;
use std::ptr::NonNull;
use std::rc::Rc;

use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};

use super::error::{Error, Result};

pub struct MmapRegion {
    base: NonNull<u8>,
    len: usize,
}

impl MmapRegion {
    /// Maps the whole of `file` read-only, private. `path` is kept only for error
    /// messages.
    pub fn map_file(path: &Path, file: &File) -> Result<Rc<MmapRegion>> {
        let len = file
            .metadata()
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len() as usize;

        if len == 0 {
            return Ok(Rc::new(MmapRegion {
                base: NonNull::dangling(),
                len: 0,
            }));
        }

        // Safety: `file` is a valid open fd for the duration of this call; the mapping
        // is read-only and private, and `len` was just read from that same fd.
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ,
                MapFlags::PRIVATE,
                file.as_fd(),
                0,
            )
        }
        .map_err(|err| Error::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(err),
        })?;

        Ok(Rc::new(MmapRegion {
            base: NonNull::new(ptr.cast()).expect("mmap succeeded but returned a null pointer"),
            len,
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            &[]
        } else {
            // Safety: `base` and `len` describe the mapping created in `map_file`,
            // which remains valid until `Drop` runs, and this crate never writes
            // through the mapping.
            unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
        }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        if self.len > 0 {
            // Safety: unmaps exactly the mapping established in `map_file`, exactly
            // once, and only once every `Rc` reference (the last borrowed string or
            // the handle's own region list) has gone away.
            unsafe {
                let _ = munmap(self.base.as_ptr().cast(), self.len);
            }
        }
    }
}

/// Owned vs. mmap-borrowed byte string (§9 Design Notes). Context strings are always
/// [`ByteString::Owned`]; stem bytes and regex source strings loaded from a compiled
/// file are [`ByteString::Borrowed`].
#[derive(Clone)]
pub enum ByteString {
    Owned(Box<[u8]>),
    Borrowed {
        region: Rc<MmapRegion>,
        offset: usize,
        len: usize,
    },
}

impl ByteString {
    pub fn owned(bytes: impl Into<Box<[u8]>>) -> Self {
        ByteString::Owned(bytes.into())
    }

    pub fn borrowed(region: Rc<MmapRegion>, offset: usize, len: usize) -> Self {
        ByteString::Borrowed { region, offset, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ByteString::Owned(bytes) => bytes,
            ByteString::Borrowed { region, offset, len } => {
                &region.as_slice()[*offset..*offset + *len]
            }
        }
    }

    pub fn from_mmap(&self) -> bool {
        matches!(self, ByteString::Borrowed { .. })
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ByteString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl PartialEq for ByteString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for ByteString {}

/// Tracks every region mapped by a single `Handle`, purely so regions with no (or no
/// longer any) borrowing strings still get unmapped when the handle closes rather than
/// living until the process exits.
#[derive(Default)]
pub struct MmapPool {
    regions: Vec<Rc<MmapRegion>>,
}

impl MmapPool {
    pub fn new() -> Self {
        MmapPool::default()
    }

    pub fn track(&mut self, region: Rc<MmapRegion>) {
        self.regions.push(region);
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Drops this pool's own references to every tracked region. Any region still
    /// borrowed by a `ByteString` a caller kept alive beyond the handle stays mapped
    /// until that reference also drops — Rust, not this method, enforces invariant 2.
    pub fn clear(&mut self) {
        self.regions.clear();
    }
}
