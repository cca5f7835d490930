//! Content digest (§4.9, ambient): a single running hash over every specfile consumed
//! during `init`, so a caller can tell whether a cached derived artifact (e.g. a
//! compiled `.bin`) is stale relative to the text sources it was built from.
//!
//! Streaming `Sha256`, the same primitive the teacher codebase uses for fs-verity
//! content addressing (`src/fsverity/digest.rs`) — applied here to specfile bytes
//! instead of filesystem object bytes.

use sha2::{Digest, Sha256};

#[derive(Default)]
pub struct DigestBuilder {
    hasher: Sha256,
    touched: bool,
}

impl DigestBuilder {
    pub fn new() -> Self {
        DigestBuilder::default()
    }

    /// `digest_add_specfile`: folds one file's bytes into the running hash, along with
    /// its path, so two rule sets built from differently-named but byte-identical files
    /// don't collide.
    pub fn add_specfile(&mut self, path: &std::path::Path, bytes: &[u8]) {
        self.hasher.update(path.as_os_str().as_encoded_bytes());
        self.hasher.update([0u8]); // path/content separator
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self.touched = true;
    }

    /// `digest_gen_hash`: finalizes the digest. A handle that loaded zero files (never
    /// happens in practice, since `init` requires at least one primary specfile) would
    /// still get a stable hash of the empty input.
    pub fn finish(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }

    pub fn is_empty(&self) -> bool {
        !self.touched
    }
}

pub fn to_hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
