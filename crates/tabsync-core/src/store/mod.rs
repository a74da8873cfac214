//! Storage abstraction for tabsync.
//!
//! The [`DocumentStore`] trait covers every operation the loader and the
//! join engines need from a document database: listing collections, full
//! replacement of a collection, reading documents back, and registering
//! query-time views. Backends: MongoDB (in the `tabsync` crate) and
//! [`memory::InMemoryStore`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::lookup::JoinSpec;
use crate::table::Record;

/// Abstract document database.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_collections`](DocumentStore::list_collections) | Names of collections and views |
/// | [`replace_collection`](DocumentStore::replace_collection) | Full replace, stage-then-swap |
/// | [`insert_documents`](DocumentStore::insert_documents) | Append documents |
/// | [`read_collection`](DocumentStore::read_collection) | Read every document of a collection or view |
/// | [`count_documents`](DocumentStore::count_documents) | Document count |
/// | [`drop_object`](DocumentStore::drop_object) | Remove a collection or view |
/// | [`create_view`](DocumentStore::create_view) | Register a live lookup view |
/// | [`close`](DocumentStore::close) | Release the connection |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of every user collection and view.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Replace the whole content of `name` with `documents`.
    ///
    /// Readers observe either the previous content or the new content,
    /// never a partially written collection. Returns the number written.
    async fn replace_collection(&self, name: &str, documents: Vec<Record>) -> Result<u64>;

    /// Append documents to `name`, creating it if needed.
    async fn insert_documents(&self, name: &str, documents: Vec<Record>) -> Result<u64>;

    /// Every document of a collection or view, including the identity
    /// field. Unknown names read as empty.
    async fn read_collection(&self, name: &str) -> Result<Vec<Record>>;

    async fn count_documents(&self, name: &str) -> Result<u64>;

    /// Remove a collection or view. Returns whether anything existed.
    async fn drop_object(&self, name: &str) -> Result<bool>;

    /// Register `name` as a non-materialized view computed from `spec`.
    /// Fails if an object named `name` already exists.
    async fn create_view(&self, name: &str, spec: &JoinSpec) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
