//! The comparator (§4.7): deterministic structural equal/subset/superset/incomparable
//! ordering of two loaded rule sets, exploiting the sorter's invariant (§4.5) that exact
//! specs trail regex specs in both stores.

use super::spec::Spec;
use super::stem::StemTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Equal,
    Subset,
    Superset,
    Incomparable,
}

fn fields_agree(a: &Spec, stems_a: &StemTable, b: &Spec, stems_b: &StemTable) -> Result<(), &'static str> {
    let regex_eq = match (a.regex.compiled(), b.regex.compiled()) {
        (Some(ra), Some(rb)) => ra.compiled_eq(rb),
        _ => a.pattern() == b.pattern(),
    };
    if !regex_eq {
        return Err("regex_str");
    }
    if a.mode != b.mode {
        return Err("mode");
    }
    if (a.stem_id == -1) != (b.stem_id == -1) {
        return Err("stem presence");
    }
    if a.stem_id != -1 {
        let stem_a = stems_a.get(a.stem_id).expect("valid stem_id (invariant 1)");
        let stem_b = stems_b.get(b.stem_id).expect("valid stem_id (invariant 1)");
        if stem_a.as_bytes() != stem_b.as_bytes() {
            return Err("stem bytes");
        }
    }
    if a.label.raw != b.label.raw {
        return Err("context");
    }
    Ok(())
}

/// Walks `specs1` and `specs2` in parallel, per §4.7. Returns the ordering and, when
/// `Incomparable`, the name of the field that disagreed (or `None` if the stores simply
/// diverge in length without a direct field conflict).
pub fn compare(
    specs1: &[Spec],
    stems1: &StemTable,
    specs2: &[Spec],
    stems2: &StemTable,
) -> (Ordering, Option<&'static str>) {
    let (mut i, mut j) = (0usize, 0usize);
    let (mut skipped_in_1, mut skipped_in_2) = (false, false);

    while i < specs1.len() && j < specs2.len() {
        let (a, b) = (&specs1[i], &specs2[j]);
        match (a.is_exact(), b.is_exact()) {
            (false, true) => {
                // spec1 still has regex specs to get through; spec2 is already exact.
                j += 1;
                skipped_in_2 = true;
            }
            (true, false) => {
                i += 1;
                skipped_in_1 = true;
            }
            _ => match fields_agree(a, stems1, b, stems2) {
                Ok(()) => {
                    i += 1;
                    j += 1;
                }
                Err(field) => return (Ordering::Incomparable, Some(field)),
            },
        }
    }

    let remaining_1 = i < specs1.len();
    let remaining_2 = j < specs2.len();

    let verdict = match (remaining_1, remaining_2) {
        (false, false) => {
            if skipped_in_1 && skipped_in_2 {
                Ordering::Incomparable
            } else {
                Ordering::Equal
            }
        }
        (true, false) => Ordering::Superset,
        (false, true) => Ordering::Subset,
        (true, true) => Ordering::Incomparable,
    };
    (verdict, None)
}
