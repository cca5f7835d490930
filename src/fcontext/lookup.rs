//! The lookup engine (§4.6): stem-narrowed, mode-filtered, reverse-order regex scan,
//! plus the best-match/alias ranking built on top of it.

use tracing::trace;

use super::error::{Error, Result};
use super::filetype;
use super::regex_engine::MatchOutcome;
use super::spec::Spec;
use super::stem::StemTable;

/// Collapse runs of consecutive `/` to a single `/` (§4.6 step 1, §8 property 3). Does
/// not otherwise touch the input — no `.`/`..` resolution, no trailing-slash trimming.
pub fn canonicalize(key: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    if !key.windows(2).any(|w| w == b"//") {
        return std::borrow::Cow::Borrowed(key);
    }
    let mut out = Vec::with_capacity(key.len());
    let mut prev_slash = false;
    for &b in key {
        if b == b'/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(b);
    }
    std::borrow::Cow::Owned(out)
}

/// The key's file stem index (§4.6 step 2): the leading path segment (inclusive of its
/// leading `/`) is looked up in `stems`; on a hit, that stem's id, otherwise `-1`. Used
/// only to prefilter candidate specs before the regex scan — every spec still matches
/// against the *whole* key (see `lookup_common`), so this never strips anything off.
fn key_stem_id(stems: &StemTable, key: &[u8]) -> i32 {
    if key.first() != Some(&b'/') {
        return -1;
    }
    let rest = &key[1..];
    let seg_len = rest.iter().position(|&b| b == b'/').unwrap_or(rest.len());
    let stem_len = seg_len + 1;
    let candidate = &key[..stem_len];
    stems.find(candidate).unwrap_or(-1)
}

pub struct Hit<'a> {
    pub spec: &'a Spec,
    pub index: usize,
}

/// `lookup_common`: the shared scan behind `lookup`, `partial_match` and the per-alias
/// probes inside `best_match`. Returns the winning spec (and its index in `specs`, used
/// by the comparator's invariants and by callers that want `prefix_len`) or `None` if
/// nothing matched. `partial` switches the stop condition from "full match" to "full or
/// partial match", per §4.6 step 4.
pub fn lookup_common<'a>(
    stems: &StemTable,
    specs: &'a [Spec],
    key: &[u8],
    mode_mask: u32,
    partial: bool,
) -> Result<Option<Hit<'a>>> {
    let canon = canonicalize(key);
    let key_stem = key_stem_id(stems, &canon);
    let mode_mask = filetype::mask(mode_mask);

    trace!(key = %String::from_utf8_lossy(&canon), mode = mode_mask, "lookup");

    for (index, spec) in specs.iter().enumerate().rev() {
        if spec.stem_id != -1 && spec.stem_id != key_stem {
            continue;
        }
        if mode_mask != 0 && spec.mode != 0 && spec.mode != mode_mask {
            continue;
        }

        let pattern = std::str::from_utf8(spec.pattern()).map_err(|_| Error::Internal {
            pattern: String::from_utf8_lossy(spec.pattern()).into_owned(),
            detail: "pattern is not valid UTF-8".to_string(),
        })?;
        let regex = spec
            .regex
            .get_or_compile(pattern)
            .map_err(|detail| Error::Internal {
                pattern: pattern.to_string(),
                detail,
            })?;

        // `regex_str` is always the spec's full pattern, stem-bearing or not (§3); the
        // stem id is only a prefilter above, so every spec matches against the whole
        // canonicalized key, same as libselinux's `lookup_common`.
        let outcome = regex.search(&canon).map_err(|detail| Error::Internal {
            pattern: pattern.to_string(),
            detail,
        })?;

        let hit = match outcome {
            MatchOutcome::Full => true,
            MatchOutcome::Partial => partial,
            MatchOutcome::None => false,
        };
        if hit {
            spec.record_match();
            return Ok(Some(Hit { spec, index }));
        }
    }

    Ok(None)
}

/// `best_match` (§4.6): probe `key` then every alias with `lookup_common`, preferring an
/// exact hit (the key's own, if any, takes priority since it's probed first), else the
/// hit with the strictly greatest `prefix_len` (again, ties favor the key, then the
/// first alias in argument order).
pub fn best_match<'a>(
    stems: &StemTable,
    specs: &'a [Spec],
    key: &[u8],
    aliases: &[&[u8]],
    mode_mask: u32,
) -> Result<Option<Hit<'a>>> {
    let mut candidates = Vec::with_capacity(1 + aliases.len());
    if let Some(hit) = lookup_common(stems, specs, key, mode_mask, false)? {
        candidates.push(hit);
    }
    for alias in aliases {
        if let Some(hit) = lookup_common(stems, specs, alias, mode_mask, false)? {
            candidates.push(hit);
        }
    }

    if let Some(exact) = candidates.iter().find(|hit| hit.spec.is_exact()) {
        return Ok(Some(Hit {
            spec: exact.spec,
            index: exact.index,
        }));
    }

    // `Iterator::max_by_key` would keep the *last* of equal-`prefix_len` candidates;
    // §4.6 requires the key (pushed first) and earlier aliases to win ties instead.
    let mut best: Option<Hit> = None;
    for hit in candidates {
        let replace = match &best {
            None => true,
            Some(current) => hit.spec.prefix_len > current.spec.prefix_len,
        };
        if replace {
            best = Some(hit);
        }
    }
    Ok(best)
}
