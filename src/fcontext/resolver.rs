//! The specfile resolver (§4.3): decides which of `{base, base.bin}` (or, with a
//! secondary suffix, `{base.suffix, base.suffix.bin}`) to open, and drives the
//! newest-then-oldest retry policy (§7) across a two-pass load.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::{Error, Result};

/// Appends `.suffix` to `base`'s path (plain string concatenation on the OS string, not
/// `Path::with_extension`, which would instead *replace* an existing extension).
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(suffix);
    PathBuf::from(s)
}

/// `P.S`, `P.S.bin` when a secondary suffix `S` is given; `P`, `P.bin` otherwise.
/// Candidate order matters: later entries win modification-time ties (§4.3), so the
/// `.bin` variant is always listed after its plain counterpart.
pub fn candidate_paths(base: &Path, suffix: Option<&str>) -> Vec<PathBuf> {
    match suffix {
        Some(s) => {
            let text = with_suffix(base, s);
            let binary = with_suffix(&text, "bin");
            vec![text, binary]
        }
        None => vec![base.to_path_buf(), with_suffix(base, "bin")],
    }
}

pub struct Candidate {
    pub path: PathBuf,
    pub mtime: SystemTime,
}

/// Stats every candidate, silently dropping ones that don't exist. Any other `stat`
/// failure is an `IOError`.
pub fn stat_candidates(base: &Path, suffix: Option<&str>) -> Result<Vec<Candidate>> {
    let mut found = Vec::new();
    for path in candidate_paths(base, suffix) {
        match std::fs::metadata(&path) {
            Ok(meta) => {
                let mtime = meta.modified().map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
                found.push(Candidate { path, mtime });
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(Error::Io { path, source }),
        }
    }
    Ok(found)
}

/// Latest modification time; later list entries win ties (§4.3).
fn pick_newest(candidates: &[Candidate]) -> &Candidate {
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.mtime >= best.mtime {
            best = c;
        }
    }
    best
}

/// Earliest modification time; earlier list entries win ties (unspecified by §4.3, so
/// this mirrors ordinary `min` semantics rather than inventing an asymmetric rule).
fn pick_oldest(candidates: &[Candidate]) -> &Candidate {
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.mtime < best.mtime {
            best = c;
        }
    }
    best
}

/// `process_file` (§4.3, §7): stats candidates for `base`/`suffix`, tries to load the
/// newest, and on failure retries the oldest. `load` receives the chosen path and
/// performs whatever format-sniffing and parsing is appropriate; its `Err` is the one
/// propagated if both attempts fail (§7: "reports the last error").
///
/// Returns `Ok(None)` when no candidate exists at all — callers decide whether that is
/// fatal (a missing primary specfile) or not (a missing `.homedirs`/`.local` overlay).
pub fn process_file<T>(
    base: &Path,
    suffix: Option<&str>,
    mut load: impl FnMut(&Path) -> Result<T>,
) -> Result<Option<T>> {
    let candidates = stat_candidates(base, suffix)?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let newest = pick_newest(&candidates).path.clone();
    match load(&newest) {
        Ok(value) => Ok(Some(value)),
        Err(_first_err) if candidates.len() == 1 => Err(_first_err),
        Err(_first_err) => {
            let oldest = pick_oldest(&candidates).path.clone();
            if oldest == newest {
                return Err(_first_err);
            }
            load(&oldest).map(Some)
        }
    }
}
