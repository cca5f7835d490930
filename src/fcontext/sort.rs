//! The sorter (§4.5): stable-partitions a freshly loaded spec store so every exact
//! (no-metachars) spec follows every regex spec, preserving relative order within each
//! group (§3 invariant 3).
//!
//! This is what lets the reverse-scan lookup (§4.6) treat "examined first" as "wins if
//! it matches": exact specs, scanned first in reverse order, win over any regex spec
//! that happens to also match, regardless of which was loaded earlier.

use super::spec::Spec;

pub fn sort_specs(specs: &mut Vec<Spec>) {
    // `Vec::sort_by_key` is not guaranteed stable-*and*-minimal-moves for this shape,
    // but `[T]::sort_by` is a stable merge sort, so a boolean key (regex=false,
    // exact=true) does exactly the stable partition this module promises.
    specs.sort_by_key(|spec| spec.is_exact());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcontext::spec::{Label, RegexSlot};
    use std::cell::Cell;

    fn spec(pattern: &str, exact: bool) -> Spec {
        Spec {
            regex_str: crate::fcontext::mmap::ByteString::owned(pattern.as_bytes().to_vec()),
            regex: RegexSlot::uncompiled(),
            stem_id: -1,
            mode: 0,
            label: Label::new("ctx"),
            has_meta_chars: !exact,
            prefix_len: pattern.len(),
            from_mmap: false,
            matches: Cell::new(0),
        }
    }

    #[test]
    fn exact_specs_trail_regex_specs_preserving_order() {
        let mut specs = vec![
            spec("a", true),
            spec("b.*", false),
            spec("c", true),
            spec("d.*", false),
        ];
        sort_specs(&mut specs);
        let patterns: Vec<&str> = specs
            .iter()
            .map(|s| std::str::from_utf8(s.pattern()).unwrap())
            .collect();
        assert_eq!(patterns, vec!["b.*", "d.*", "a", "c"]);
    }
}
