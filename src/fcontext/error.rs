use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the file-context backend.
///
/// `NotFound` is deliberately absent here: a failed `lookup`/`best_match` is a normal
/// outcome, not an exception, so those operations return `Option<Label>` rather than
/// folding "no match" into this enum.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}: {detail}")]
    Format { path: PathBuf, detail: String },

    #[error("{path}: regex engine version mismatch (file {file}, host {host})")]
    VersionMismatch {
        path: PathBuf,
        file: String,
        host: String,
    },

    #[error("{path}: invalid security context {context:?}: {reason}")]
    Validate {
        path: PathBuf,
        context: String,
        reason: String,
    },

    #[error("{path}:{line}: duplicate spec for {pattern:?} ({kind})")]
    DuplicateSpec {
        path: PathBuf,
        line: usize,
        pattern: String,
        kind: DuplicateKind,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: path exceeds platform maximum of {max} bytes")]
    NameTooLong { path: PathBuf, max: usize },

    #[error("regex engine returned an unexpected error while matching {pattern:?}: {detail}")]
    Internal { pattern: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// Same pattern, same context: redundant.
    Redundant,
    /// Same pattern, different context: conflicting.
    Conflicting,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKind::Redundant => write!(f, "redundant"),
            DuplicateKind::Conflicting => write!(f, "conflicting"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
