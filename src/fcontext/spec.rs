//! The spec store (§3): one entry per pattern→label rule, plus the lazy-compile slot
//! and match counter that make a loaded [`Spec`] safe to query without external locking
//! as long as the handle itself stays on one thread (§5).

use std::cell::{Cell, OnceCell};

use super::mmap::ByteString;
use super::regex_engine::CompiledRegex;

/// The sentinel raw context meaning "no label assigned" (§7, §8 S4). A spec whose raw
/// context equals this string always resolves to `NotFound` at the public boundary.
pub const NONE_CONTEXT: &str = "<<none>>";

/// A raw/translated security-context pair (§3). `translated` starts empty; it is filled
/// in by the substitution layer on first use and is never populated by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub raw: String,
    pub translated: Option<String>,
}

impl Label {
    pub fn new(raw: impl Into<String>) -> Self {
        Label {
            raw: raw.into(),
            translated: None,
        }
    }

    /// The string callers should actually use: the translated context if one has been
    /// set, otherwise the raw context.
    pub fn context(&self) -> &str {
        self.translated.as_deref().unwrap_or(&self.raw)
    }

    pub fn is_none(&self) -> bool {
        self.raw == NONE_CONTEXT
    }
}

/// Lazy, write-once compile slot (§9 Design Notes). A text-loaded spec starts
/// `Uncompiled`; the first lookup that touches it calls [`RegexSlot::get_or_compile`],
/// which either returns a cached [`CompiledRegex`] or compiles one and caches it.
///
/// `OnceCell` gives "observe either Uncompiled or Compiled, never a half-written value"
/// for free, at the cost of `Spec` (and therefore `Handle`) not being `Sync`. That's the
/// "require external synchronization for multi-threaded use" half of §5's policy choice
/// — see DESIGN.md.
#[derive(Default)]
pub struct RegexSlot(OnceCell<Result<CompiledRegex, String>>);

impl RegexSlot {
    pub fn uncompiled() -> Self {
        RegexSlot(OnceCell::new())
    }

    pub fn already_compiled(regex: CompiledRegex) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(Ok(regex));
        RegexSlot(cell)
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.0.get(), Some(Ok(_)))
    }

    /// The compiled regex, if the slot has already settled successfully. Never
    /// triggers a compile; used by the comparator, which only wants to compare regexes
    /// that are *already* compiled (§4.7).
    pub fn compiled(&self) -> Option<&CompiledRegex> {
        match self.0.get() {
            Some(Ok(regex)) => Some(regex),
            _ => None,
        }
    }

    /// `compile_regex(spec)` (§6.2): idempotent, returns the same result on every call
    /// once the slot has settled.
    pub fn get_or_compile(&self, pattern: &str) -> Result<&CompiledRegex, String> {
        self.0
            .get_or_init(|| CompiledRegex::compile(pattern).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| e.clone())
    }
}

pub struct Spec {
    pub regex_str: ByteString,
    pub regex: RegexSlot,
    pub stem_id: i32,
    pub mode: u32,
    pub label: Label,
    pub has_meta_chars: bool,
    pub prefix_len: usize,
    pub from_mmap: bool,
    pub matches: Cell<u64>,
}

impl Spec {
    pub fn is_exact(&self) -> bool {
        !self.has_meta_chars
    }

    pub fn pattern(&self) -> &[u8] {
        self.regex_str.as_bytes()
    }

    pub fn record_match(&self) {
        self.matches.set(self.matches.get() + 1);
    }
}

/// Fallback used when loading a binary file whose version predates `PREFIX_LEN_VERS`
/// (§6.1): compute it ourselves rather than trust an absent field.
///
/// True fixed-prefix length of `pattern`: the count of leading bytes before the first
/// regex metacharacter. Also used to compute `has_meta_chars`.
pub fn prefix_len(pattern: &[u8]) -> usize {
    const META: &[u8] = b".^$*+?()[]{}|\\";
    pattern
        .iter()
        .position(|b| META.contains(b))
        .unwrap_or(pattern.len())
}

pub fn has_meta_chars(pattern: &[u8]) -> bool {
    prefix_len(pattern) != pattern.len()
}
