//! Schema error types
//!
//! Error codes:
//! - SCHEMA_NOT_CONFIGURED (REJECT)
//! - SCHEMA_COLLECTION_NOT_CONFIGURED (REJECT)
//! - SCHEMA_VALIDATION_FAILED (REJECT)
//! - SCHEMA_INITIALIZATION_FAILED (FATAL)
//! - SCHEMA_STORE_ERROR (ERROR)
//! - SCHEMA_MALFORMED_CONFIG (ERROR)
//! - SCHEMA_INVALID_REGISTRY (FATAL)

use std::fmt;

use thiserror::Error;

use super::types::FieldType;
use crate::store::StoreError;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Why a field failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// Absent, null, or an empty string on a required field
    Required,
    /// Present with the wrong kind of value
    TypeMismatch { expected: FieldType },
}

/// A single field-level rule failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: ViolationReason,
}

impl Violation {
    pub fn required(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::Required,
        }
    }

    pub fn type_mismatch(field: impl Into<String>, expected: FieldType) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::TypeMismatch { expected },
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ViolationReason::Required => write!(f, "field {} is required", self.field),
            ViolationReason::TypeMismatch { expected } => {
                write!(f, "field {} must be of type {}", self.field, expected)
            }
        }
    }
}

/// Newline-joined violation messages, in report order.
pub fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Schema registry, initializer and validator failures
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Collection absent from the in-process registry
    #[error("collection '{collection}' is not declared in the schema registry")]
    NotConfigured { collection: String },

    /// Collection has no persisted config document
    #[error("collection '{collection}' is not configured")]
    CollectionNotConfigured { collection: String },

    /// One or more field violations; message lists all of them
    #[error("{}", join_violations(.violations))]
    ValidationFailed {
        collection: String,
        violations: Vec<Violation>,
    },

    /// Reading or writing schema metadata failed
    #[error("schema initialization failed: {source}")]
    InitializationFailed {
        #[source]
        source: StoreError,
    },

    /// Backend failure outside initialization, with context
    #[error("{operation} for collection '{collection}' failed: {source}")]
    Store {
        operation: &'static str,
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Persisted config document cannot be interpreted
    #[error("malformed config for collection '{collection}': {reason}")]
    MalformedConfig { collection: String, reason: String },

    /// Registry declaration breaks a structural rule
    #[error("invalid schema registry: {0}")]
    InvalidRegistry(String),
}

impl SchemaError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::NotConfigured { .. } => "SCHEMA_NOT_CONFIGURED",
            SchemaError::CollectionNotConfigured { .. } => "SCHEMA_COLLECTION_NOT_CONFIGURED",
            SchemaError::ValidationFailed { .. } => "SCHEMA_VALIDATION_FAILED",
            SchemaError::InitializationFailed { .. } => "SCHEMA_INITIALIZATION_FAILED",
            SchemaError::Store { .. } => "SCHEMA_STORE_ERROR",
            SchemaError::MalformedConfig { .. } => "SCHEMA_MALFORMED_CONFIG",
            SchemaError::InvalidRegistry(_) => "SCHEMA_INVALID_REGISTRY",
        }
    }

    /// Fatal errors stop startup; the app must not reach data-dependent work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchemaError::InitializationFailed { .. } | SchemaError::InvalidRegistry(_)
        )
    }

    /// Violations carried by a `ValidationFailed` error
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            SchemaError::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}
