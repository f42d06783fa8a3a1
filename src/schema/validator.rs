//! Document validator
//!
//! Validation semantics:
//! - Rules come from the persisted collection config, not the in-process
//!   registry; an unconfigured collection cannot be validated
//! - Required fields must be present, non-null and not the empty string
//! - Present, non-null values must match the declared type exactly
//! - Every declared field is checked; all violations are reported together,
//!   in field declaration order
//! - Undeclared fields are ignored
//!
//! The validator never writes. Callers persist only after `Ok(true)`.

use std::sync::Arc;

use super::errors::{join_violations, SchemaError, SchemaResult, Violation};
use super::types::CollectionConfig;
use super::config_path;
use crate::observability::{log_event_with_fields, Event};
use crate::store::{Document, DocumentStore, Value};

/// Validates candidate records against persisted collection configs.
pub struct DocumentValidator<S> {
    store: Arc<S>,
}

impl<S> Clone for DocumentValidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> DocumentValidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reads the persisted config of `collection`.
    ///
    /// # Errors
    ///
    /// - `CollectionNotConfigured` if no config document exists
    /// - `Store` if the backend could not be read
    /// - `MalformedConfig` if the document cannot be interpreted
    pub async fn get_collection_config(&self, collection: &str) -> SchemaResult<CollectionConfig> {
        let doc = self
            .store
            .read_document(&config_path(collection))
            .await
            .map_err(|source| SchemaError::Store {
                operation: "read collection config",
                collection: collection.to_string(),
                source,
            })?
            .ok_or_else(|| SchemaError::CollectionNotConfigured {
                collection: collection.to_string(),
            })?;

        CollectionConfig::from_document(collection, &doc)
    }

    /// Validates `record` against the persisted rules of `collection`.
    ///
    /// Returns `Ok(true)` when every rule holds; otherwise fails with
    /// `ValidationFailed` carrying every violation.
    pub async fn validate(&self, collection: &str, record: &Document) -> SchemaResult<bool> {
        let config = self.get_collection_config(collection).await?;
        let violations = check(&config, record);

        if violations.is_empty() {
            return Ok(true);
        }

        log_event_with_fields(
            Event::ValidationRejected,
            &[
                ("collection", collection),
                ("violations", &join_violations(&violations)),
            ],
        );

        Err(SchemaError::ValidationFailed {
            collection: collection.to_string(),
            violations,
        })
    }
}

/// Evaluates the field rules of `config` against `record`.
///
/// Pure and stateless; the result is in field declaration order.
pub fn check(config: &CollectionConfig, record: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (name, field) in config.fields() {
        let value = record.get(name).filter(|v| !v.is_null());

        if field.required && is_missing(value) {
            violations.push(Violation::required(name));
            continue;
        }

        if let Some(value) = value {
            if !field.field_type.accepts(value) {
                violations.push(Violation::type_mismatch(name, field.field_type));
            }
        }
    }

    violations
}

/// Absent, null (already filtered) or the empty string.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
