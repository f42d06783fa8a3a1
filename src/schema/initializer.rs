//! Schema initializer
//!
//! Brings the persisted schema metadata up to the registry's version:
//!
//! 1. Read `_system/schema`
//! 2. If it is absent or its version is lower than the registry's, write the
//!    metadata document and one `_collections/<name>` config per collection
//!    in a single atomic batch
//! 3. Otherwise do nothing
//!
//! Safe to run on every process start and from racing processes: every
//! writer writes the same content to the same well-known ids.

use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::{config_path, metadata_path};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{Document, DocumentStore, StoreError, StoreResult, Timestamp, Value, WriteBatch};

/// Applies the registry's schema to a store.
pub struct SchemaInitializer<S> {
    registry: Arc<SchemaRegistry>,
    store: Arc<S>,
}

impl<S: DocumentStore> SchemaInitializer<S> {
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<S>) -> Self {
        Self { registry, store }
    }

    /// Ensures the persisted schema matches the registry.
    ///
    /// Returns `true` if the metadata and collection configs were written,
    /// `false` if the persisted version was already current.
    ///
    /// # Errors
    ///
    /// `InitializationFailed` wrapping the store error if the read or the
    /// batch write fails. The batch is atomic, so no partial state remains.
    pub async fn ensure_schema_applied(&self) -> SchemaResult<bool> {
        let declared = self.registry.version();
        log_event_with_fields(Event::SchemaCheck, &[("declared_version", &declared.to_string())]);

        let persisted = self.persisted_version().await.map_err(fail)?;
        if persisted >= declared {
            log_event_with_fields(
                Event::SchemaCurrent,
                &[
                    ("declared_version", &declared.to_string()),
                    ("persisted_version", &persisted.to_string()),
                ],
            );
            return Ok(false);
        }

        let batch = self.build_batch(Timestamp::now());
        self.store.batch_write(batch).await.map_err(fail)?;

        log_event_with_fields(
            Event::SchemaApplied,
            &[
                ("collections", &self.registry.collection_names().join(",")),
                ("from_version", &persisted.to_string()),
                ("to_version", &declared.to_string()),
            ],
        );
        Ok(true)
    }

    /// Version recorded in the metadata document.
    ///
    /// A missing document, a missing `version` field, or a value that is not
    /// a non-negative number all count as version 0.
    pub async fn persisted_version(&self) -> StoreResult<u32> {
        let meta = self.store.read_document(&metadata_path()).await?;
        Ok(meta
            .as_ref()
            .and_then(|doc| doc.get("version"))
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(f64::from(u32::MAX)) as u32)
            .unwrap_or(0))
    }

    fn build_batch(&self, now: Timestamp) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.set(metadata_path(), self.metadata_document(now));

        for (name, config) in self.registry.collections() {
            batch.set(config_path(name), config.to_document(now));
        }

        batch
    }

    fn metadata_document(&self, now: Timestamp) -> Document {
        let collections = self
            .registry
            .collection_names()
            .into_iter()
            .map(Value::from)
            .collect();

        let mut doc = Document::new();
        doc.insert("version".into(), Value::from(self.registry.version()));
        doc.insert("created_at".into(), Value::Timestamp(now));
        doc.insert("last_updated".into(), Value::Timestamp(now));
        doc.insert("collections".into(), Value::Array(collections));
        doc
    }
}

fn fail(source: StoreError) -> SchemaError {
    log_event_with_fields(Event::SchemaApplyFailed, &[("error", &source.to_string())]);
    SchemaError::InitializationFailed { source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn initializer(store: &Arc<MemoryStore>) -> SchemaInitializer<MemoryStore> {
        SchemaInitializer::new(Arc::new(SchemaRegistry::storefront()), Arc::clone(store))
    }

    async fn write_version(store: &MemoryStore, version: Value) {
        let mut doc = Document::new();
        doc.insert("version".into(), version);
        let mut batch = WriteBatch::new();
        batch.set(metadata_path(), doc);
        store.batch_write(batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_fresh_store_is_initialized() {
        let store = Arc::new(MemoryStore::new());
        assert!(initializer(&store).ensure_schema_applied().await.unwrap());

        // metadata + users + products
        assert_eq!(store.document_count().await, 3);
        assert_eq!(initializer(&store).persisted_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_metadata_document_shape() {
        let store = Arc::new(MemoryStore::new());
        initializer(&store).ensure_schema_applied().await.unwrap();

        let meta = store.read_document(&metadata_path()).await.unwrap().unwrap();
        assert_eq!(meta["version"], Value::Number(2.0));
        assert_eq!(meta["created_at"], meta["last_updated"]);
        assert_eq!(
            meta["collections"],
            Value::Array(vec![Value::from("users"), Value::from("products")])
        );
    }

    #[tokio::test]
    async fn test_stale_version_is_upgraded() {
        let store = Arc::new(MemoryStore::new());
        write_version(&store, Value::Number(1.0)).await;

        assert!(initializer(&store).ensure_schema_applied().await.unwrap());
        assert_eq!(initializer(&store).persisted_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_newer_persisted_version_left_alone() {
        let store = Arc::new(MemoryStore::new());
        write_version(&store, Value::Number(7.0)).await;

        assert!(!initializer(&store).ensure_schema_applied().await.unwrap());
        assert_eq!(store.batches_committed(), 1);
    }

    #[tokio::test]
    async fn test_non_numeric_version_counts_as_zero() {
        let store = Arc::new(MemoryStore::new());
        write_version(&store, Value::from("2")).await;
        assert_eq!(initializer(&store).persisted_version().await.unwrap(), 0);

        write_version(&store, Value::Null).await;
        assert_eq!(initializer(&store).persisted_version().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_initialization() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);

        let err = initializer(&store).ensure_schema_applied().await.unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InitializationFailed {
                source: StoreError::Unavailable
            }
        ));
        assert!(err.is_fatal());
    }
}
