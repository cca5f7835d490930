//! The stem table (§3): a deduplicated store of leading path segments (`/usr`, `/var`,
//! …) used to prune lookup candidates before a regex ever runs.
//!
//! Stems are unique within one handle by `(len, bytes)`. The table keeps an auxiliary
//! `HashMap` keyed on the byte content purely to make that dedup check (and the binary
//! loader's file-local-id translation, §4.1) O(1) instead of a linear scan; the `Vec` is
//! the table of record and stem ids are indices into it.

use std::collections::HashMap;

use super::mmap::ByteString;

pub struct Stem {
    pub buf: ByteString,
}

impl Stem {
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

#[derive(Default)]
pub struct StemTable {
    stems: Vec<Stem>,
    by_bytes: HashMap<Box<[u8]>, usize>,
}

impl StemTable {
    pub fn new() -> Self {
        StemTable::default()
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn get(&self, id: i32) -> Option<&Stem> {
        if id < 0 {
            None
        } else {
            self.stems.get(id as usize)
        }
    }

    /// Returns the id of the stem with these exact bytes, if one already exists.
    pub fn find(&self, bytes: &[u8]) -> Option<i32> {
        self.by_bytes.get(bytes).map(|&ix| ix as i32)
    }

    /// Inserts a new, previously-unseen stem and returns its id. Callers are expected to
    /// have called [`Self::find`] first; this does not itself dedup.
    pub fn insert(&mut self, buf: ByteString) -> i32 {
        let id = self.stems.len();
        self.by_bytes.insert(buf.as_bytes().to_vec().into_boxed_slice(), id);
        self.stems.push(Stem { buf });
        id as i32
    }

    /// Finds the stem by bytes, inserting it if absent. Used by the binary loader to
    /// translate a file-local stem id into a handle-local one (§4.1).
    pub fn intern(&mut self, bytes: &[u8], make: impl FnOnce() -> ByteString) -> i32 {
        if let Some(id) = self.find(bytes) {
            id
        } else {
            self.insert(make())
        }
    }
}
