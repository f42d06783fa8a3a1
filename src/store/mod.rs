//! Document store subsystem
//!
//! The store is the only shared mutable resource of the data core. It offers
//! a small document-oriented API:
//!
//! - `read_document(path)` returning the document or nothing
//! - `batch_write(batch)` applying a set of upserts all-or-nothing
//! - `list_documents(collection)` for catalog listings and identity lookups
//!
//! Two backends are provided: `MemoryStore` (process-local) and `FileStore`
//! (checksummed append-only journal).

mod batch;
mod checksum;
mod document;
mod errors;
mod journal;
mod memory;
mod record;

use std::future::Future;

pub use batch::{WriteBatch, WriteOp};
pub use document::{document_from_json, document_to_json, Document, DocumentPath, Timestamp, Value};
pub use errors::{StoreError, StoreResult};
pub use journal::FileStore;
pub use memory::MemoryStore;

/// Asynchronous document-oriented storage backend.
///
/// Every call is a suspension point. Implementations must make
/// `batch_write` atomic: a concurrent reader observes either none or all of
/// the batch's writes.
pub trait DocumentStore: Send + Sync {
    /// Reads one document. `Ok(None)` when it does not exist.
    fn read_document(
        &self,
        path: &DocumentPath,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Applies every write in `batch` or none of them.
    fn batch_write(&self, batch: WriteBatch) -> impl Future<Output = StoreResult<()>> + Send;

    /// Lists all documents of a collection, ordered by id.
    fn list_documents(
        &self,
        collection: &str,
    ) -> impl Future<Output = StoreResult<Vec<(String, Document)>>> + Send;
}
