//! The regex-engine collaborator (§6.2): compiles patterns, matches paths against them,
//! serializes/deserializes compiled automata, and compares two compiled patterns.
//!
//! Grounded in `regex-automata`'s dense DFA, which is both serializable (for the binary
//! loader's "adopt the blob if the arch fingerprint matches" path) and immutably
//! searchable (`&self`, no per-thread cache), unlike a hybrid/lazy DFA — which matters
//! here because the concurrency model (spec §5) requires lookup to be safe for
//! concurrent readers without external synchronization.

use regex_automata::{
    dfa::{dense, Automaton},
    Anchored, Input,
};

use super::error::{Error, Result};

/// This crate's own identification of its regex engine "ABI": a change here means
/// serialized blobs from a different build are not safely adoptable.
pub fn engine_version() -> &'static str {
    concat!("regex-automata-dense-dfa-", env!("CARGO_PKG_VERSION"))
}

/// Target-triple-ish fingerprint used to decide whether a serialized DFA blob (which
/// embeds native endianness and pointer-sized state IDs) can be adopted as-is.
pub fn engine_arch_string() -> String {
    let endian = if cfg!(target_endian = "little") { "le" } else { "be" };
    format!("{}-{}", std::env::consts::ARCH, endian)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Full,
    Partial,
    None,
}

/// A compiled pattern. Always a fully-owned DFA: a blob adopted from a mapped region is
/// deserialized and then copied out (`to_owned`), so the compiled regex never needs to
/// keep the backing `MmapRegion` alive past the end of `init`.
#[derive(Clone)]
pub struct CompiledRegex {
    dfa: dense::DFA<Vec<u32>>,
}

impl CompiledRegex {
    /// Idempotent lazy compile from a pattern source string (§6.2 `compile_regex`).
    pub fn compile(pattern: &str) -> Result<Self> {
        let dfa = dense::Builder::new()
            .syntax(
                regex_automata::util::syntax::Config::new()
                    .unicode(false)
                    .utf8(false),
            )
            .build(pattern)
            .map_err(|err| Error::Internal {
                pattern: pattern.to_string(),
                detail: err.to_string(),
            })?;
        Ok(CompiledRegex { dfa })
    }

    /// Native-endian serialization, the inverse of [`Self::from_bytes`]. Used only by
    /// tests that exercise the binary-loader code path without shelling out to an
    /// external compiler.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.dfa.to_bytes_native_endian()
    }

    /// Deserialize a compiled DFA from a byte slice, per `regex_load_mmap`. Returns
    /// `None` (never an error) on any framing problem — an unreadable blob is simply
    /// not adopted, and the caller falls back to lazy compilation from `regex_str`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (dfa, _nread) = dense::DFA::from_bytes(bytes).ok()?;
        Some(CompiledRegex { dfa: dfa.to_owned() })
    }

    /// `regex_match(handle, text, partial)`: drives the DFA by hand, byte by byte, so a
    /// single forward pass yields full-match, partial-match, and dead-end-here in one
    /// shot rather than running two separate searches.
    pub fn search(&self, haystack: &[u8]) -> std::result::Result<MatchOutcome, String> {
        let input = Input::new(haystack).anchored(Anchored::Yes);
        let mut state = self
            .dfa
            .start_state_forward(&input)
            .map_err(|err| err.to_string())?;

        for &byte in haystack {
            state = self.dfa.next_state(state, byte);
            if self.dfa.is_dead_state(state) {
                return Ok(MatchOutcome::None);
            }
        }
        state = self.dfa.next_eoi_state(state);

        if self.dfa.is_match_state(state) {
            Ok(MatchOutcome::Full)
        } else if self.dfa.is_dead_state(state) {
            Ok(MatchOutcome::None)
        } else {
            Ok(MatchOutcome::Partial)
        }
    }

    /// `regex_cmp(a, b)`: two compiled patterns are equal iff their serialized forms are
    /// byte-identical. Good enough for the comparator (§4.7), which only needs to tell
    /// "same automaton" from "different", not a structural diff.
    pub fn compiled_eq(&self, other: &CompiledRegex) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl std::fmt::Debug for CompiledRegex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRegex")
            .field("bytes", &self.dfa.to_bytes_native_endian().len())
            .finish()
    }
}
