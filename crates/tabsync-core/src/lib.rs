//! # tabsync core
//!
//! Shared, I/O-free logic for tabsync: the in-memory table model, the
//! relational merge engine, the `$lookup` interpreter behind join
//! specifications, link diagnostics, and the document store abstraction.
//!
//! This crate contains no tokio, database driver, or filesystem code.
//! Everything that touches a file or a server lives in the `tabsync`
//! crate.

pub mod diagnostics;
pub mod lookup;
pub mod merge;
pub mod store;
pub mod table;

pub use lookup::{JoinSpec, LookupStep};
pub use merge::{JoinHow, MergePlan};
pub use table::{Record, Table};
