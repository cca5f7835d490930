//! File-context labeling backend: loads pathname-pattern-to-security-label rule sets
//! (text or compiled-binary) and answers "what label does this path get" queries via a
//! stem-indexed, mode-filtered, last-match-wins lookup.
//!
//! Module map mirrors the component table: [`stem`]/[`spec`] are the data model,
//! [`binary`]/[`text`]/[`resolver`] are the loaders, [`sort`] and [`lookup`] are the
//! query engine, [`compare`] is the structural comparator, and [`digest`]/[`subs`]/
//! [`validate`]/[`env`] are the ambient stack every real specfile-consuming crate in
//! this family carries alongside the core.

pub mod binary;
pub mod compare;
pub mod digest;
pub mod env;
pub mod error;
pub mod filetype;
pub mod handle;
pub mod lookup;
pub mod mmap;
pub mod regex_engine;
pub mod resolver;
pub mod sort;
pub mod spec;
pub mod stem;
pub mod subs;
pub mod text;
pub mod validate;

pub use compare::Ordering;
pub use env::Environment;
pub use error::{DuplicateKind, Error, Result};
pub use handle::{Handle, Options};
pub use spec::Label;
