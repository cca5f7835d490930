//! The substitution loader (§4.10, ambient): parses `.subs`/`.subs_dist` alias tables
//! and exposes a lookup callers consult before `lookup`/`best_match`.
//!
//! Grammar mirrors the text rule file's sibling shape (§4.2): two whitespace-separated
//! tokens, `#`-comments, blank lines skipped. The teacher's own `selabel.rs` has the
//! same two-pass load order and `HashMap<OsString, OsString>` shape (`process_subs_file`,
//! `check_aliased`); this keeps that structure but on `String` path tokens and with the
//! dist-then-local override order `.subs_dist`, `.subs` makes explicit (§4.10).

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::error::{Error, Result};

#[derive(Default)]
pub struct SubsTable {
    aliases: HashMap<String, String>,
}

impl SubsTable {
    pub fn new() -> Self {
        SubsTable::default()
    }

    /// Looks up `path`'s substituted form, if any. Mirrors `check_aliased` in the
    /// teacher's `selabel.rs`.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.aliases.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Loads one `.subs`/`.subs_dist` file, inserting into (and overriding) whatever is
    /// already present. Caller controls load order (dist first, then local, §4.10).
    pub fn load(&mut self, path: &Path, reader: impl Read) -> Result<()> {
        for (lineno, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let alias = parts.next().expect("non-empty after trim");
            let Some(original) = parts.next() else {
                return Err(Error::Format {
                    path: path.to_path_buf(),
                    detail: format!("line {}: missing original path", lineno + 1),
                });
            };
            if parts.next().is_some() {
                return Err(Error::Format {
                    path: path.to_path_buf(),
                    detail: format!("line {}: trailing data", lineno + 1),
                });
            }
            self.aliases.insert(alias.to_string(), original.to_string());
        }
        Ok(())
    }
}
