//! The text loader (§4.2): reads a line-oriented rule file, one line at a time, via
//! [`process_line`], appending specs to the store. No regex compilation happens here —
//! specs stay `Uncompiled` until the first lookup that touches them.
//!
//! Line grammar (shared with the teacher's own textual parser in `selabel.rs`):
//! `regex [ -type ] context`, `#`-comment and blank lines skipped, `type` one of
//! `b c d p l s -`.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::error::{Error, Result};
use super::filetype;
use super::mmap::ByteString;
use super::spec::{self, Label, RegexSlot, Spec};
use super::stem::StemTable;

/// Finds the stem (§3: a leading path segment) embedded in a pattern's literal prefix,
/// if the prefix reaches past a second `/`. A pattern like `/etc(/.*)?` has prefix
/// `/etc` (metachar `(` stops it) and stem `/etc`; a pattern like `etc.conf` or `/` has
/// no stem at all.
fn embedded_stem(pattern: &[u8], prefix_len: usize) -> Option<&[u8]> {
    if pattern.first() != Some(&b'/') {
        return None;
    }
    let rest = &pattern[1..];
    let seg_len = rest.iter().position(|&b| b == b'/')?;
    let stem_len = seg_len + 1;
    if stem_len <= prefix_len {
        Some(&pattern[..stem_len])
    } else {
        None
    }
}

/// `process_line` (§6.2): parses one line and appends the resulting spec to `specs`,
/// interning its stem (if any) into `stems`. Returns `Ok(())` for blank/comment lines
/// without appending anything.
pub fn process_line(
    path: &Path,
    lineno: usize,
    line: &str,
    stems: &mut StemTable,
    specs: &mut Vec<Spec>,
) -> Result<()> {
    let mut parts = line.split_whitespace();
    let Some(first) = parts.next() else {
        return Ok(()); // blank or all-whitespace
    };
    if first.starts_with('#') {
        return Ok(());
    }
    let pattern = first;

    let Some(next) = parts.next() else {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: format!("line {lineno}: missing separator after regex"),
        });
    };

    let (mode, context) = if let Some(code) = next.strip_prefix('-') {
        let Some(mode) = code.bytes().next().filter(|_| code.len() == 1).and_then(filetype::from_type_code) else {
            return Err(Error::Format {
                path: path.to_path_buf(),
                detail: format!("line {lineno}: invalid type code -{code}"),
            });
        };
        let Some(context) = parts.next() else {
            return Err(Error::Format {
                path: path.to_path_buf(),
                detail: format!("line {lineno}: missing context field"),
            });
        };
        (mode, context)
    } else {
        (0, next)
    };

    if parts.next().is_some() {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: format!("line {lineno}: trailing data"),
        });
    }

    let pattern_bytes = pattern.as_bytes();
    let prefix_len = spec::prefix_len(pattern_bytes);
    let has_meta_chars = spec::has_meta_chars(pattern_bytes);
    let stem_id = match embedded_stem(pattern_bytes, prefix_len) {
        Some(bytes) => stems.intern(bytes, || ByteString::owned(bytes.to_vec())),
        None => -1,
    };

    specs.push(Spec {
        regex_str: ByteString::owned(pattern_bytes.to_vec()),
        regex: RegexSlot::uncompiled(),
        stem_id,
        mode,
        label: Label::new(context),
        has_meta_chars,
        prefix_len,
        from_mmap: false,
        matches: std::cell::Cell::new(0),
    });

    Ok(())
}

/// Reads every line of `reader` through [`process_line`]. The whole file is rejected
/// (and nothing is appended that wasn't already) on the first malformed line, per §4.2.
pub fn load_text(
    path: &Path,
    reader: impl Read,
    stems: &mut StemTable,
    specs: &mut Vec<Spec>,
) -> Result<()> {
    for (lineno, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        process_line(path, lineno + 1, &line, stems, specs)?;
    }
    Ok(())
}
