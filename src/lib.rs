//! File-context (pathname → security-label) lookup backend.
//!
//! See [`fcontext`] for the module map; the commonly used types are re-exported here.

pub mod fcontext;

pub use fcontext::{DuplicateKind, Environment, Error, Handle, Label, Options, Ordering, Result};
