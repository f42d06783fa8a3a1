//! In-process document store
//!
//! Batches are staged on a copy of the document map and swapped in under the
//! write lock, so readers never observe a partially applied batch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use super::batch::WriteBatch;
use super::document::{Document, DocumentPath};
use super::errors::{StoreError, StoreResult};
use super::DocumentStore;

const NO_FAULT: usize = usize::MAX;

/// Memory-backed store with fault hooks for exercising failure paths.
#[derive(Debug)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, Document>>,
    unavailable: AtomicBool,
    fail_batch_after: AtomicUsize,
    batches_committed: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            unavailable: AtomicBool::new(false),
            fail_batch_after: AtomicUsize::new(NO_FAULT),
            batches_committed: AtomicUsize::new(0),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next non-empty batch abort after staging `applied` writes.
    ///
    /// The fault is consumed by that batch whether or not it triggers.
    pub fn fail_next_batch_after(&self, applied: usize) {
        self.fail_batch_after.store(applied, Ordering::SeqCst);
    }

    /// Number of batches committed so far.
    pub fn batches_committed(&self) -> usize {
        self.batches_committed.load(Ordering::SeqCst)
    }

    /// Number of documents across all collections.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn read_document(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.check_available()?;
        Ok(self.documents.read().await.get(path).cloned())
    }

    async fn batch_write(&self, batch: WriteBatch) -> StoreResult<()> {
        self.check_available()?;
        if batch.is_empty() {
            return Ok(());
        }

        let fail_after = self.fail_batch_after.swap(NO_FAULT, Ordering::SeqCst);
        let total = batch.len();

        let mut documents = self.documents.write().await;
        let mut staged = documents.clone();
        for (applied, op) in batch.into_ops().into_iter().enumerate() {
            if applied == fail_after {
                return Err(StoreError::BatchAborted { applied, total });
            }
            op.apply(&mut staged);
        }

        *documents = staged;
        self.batches_committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        self.check_available()?;
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|(path, _)| path.collection == collection)
            .map(|(path, doc)| (path.id.clone(), doc.clone()))
            .collect())
    }
}
