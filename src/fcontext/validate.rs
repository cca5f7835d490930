//! `selabel_validate` (§6.2): syntactic context validation. Out of scope per §1 is the
//! *policy* question of whether a given `user:role:type` triple is valid for a loaded
//! policy; this crate ships only the permissive shape check every context obeys
//! regardless of policy, and accepts an injected closure for callers that want more.

use super::error::{Error, Result};

/// A well-formed raw context has the shape `user:role:type[:range]`, at least three
/// non-empty colon-separated fields. `<<none>>` (§3, §8 S4) is always valid — it is a
/// sentinel, not a context.
pub fn default_validate(context: &str) -> std::result::Result<(), String> {
    if context == super::spec::NONE_CONTEXT {
        return Ok(());
    }
    let fields: Vec<&str> = context.split(':').collect();
    if fields.len() < 3 {
        return Err(format!(
            "expected at least user:role:type, got {} field(s)",
            fields.len()
        ));
    }
    if fields.iter().any(|f| f.is_empty()) {
        return Err("empty field in context".to_string());
    }
    Ok(())
}

/// A pluggable validator. `None` runs [`default_validate`]; `Some(f)` lets a caller plug
/// in policy-aware validation (checking against a loaded SELinux policy, for instance)
/// without this crate needing to know anything about policy representation.
pub type Validator = dyn Fn(&str) -> std::result::Result<(), String>;

pub fn validate(
    path: &std::path::Path,
    context: &str,
    validator: Option<&Validator>,
) -> Result<()> {
    let result = match validator {
        Some(f) => f(context),
        None => default_validate(context),
    };
    result.map_err(|reason| Error::Validate {
        path: path.to_path_buf(),
        context: context.to_string(),
        reason,
    })
}
