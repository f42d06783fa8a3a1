//! Schema subsystem
//!
//! Three components compose linearly:
//!
//! - `SchemaRegistry`: compiled-in, versioned collection declarations
//! - `SchemaInitializer`: writes metadata + per-collection configs when the
//!   persisted version is behind
//! - `DocumentValidator`: checks records against the persisted configs
//!
//! # Persisted layout
//!
//! - `_system/schema`: `{version, created_at, last_updated, collections}`
//! - `_collections/<name>`: `{fields, indexes, created_at}`
//!
//! `unique` flags and index declarations are advisory metadata; validation
//! does not enforce them.

mod errors;
mod initializer;
mod registry;
mod types;
mod validator;

pub use errors::{join_violations, SchemaError, SchemaResult, Violation, ViolationReason};
pub use initializer::SchemaInitializer;
pub use registry::{SchemaRegistry, PRODUCTS, STOREFRONT_SCHEMA_VERSION, USERS};
pub use types::{CollectionConfig, FieldConfig, FieldType, IndexDecl};
pub use validator::{check, DocumentValidator};

use crate::store::DocumentPath;

/// Collection holding the schema metadata document
pub const SYSTEM_COLLECTION: &str = "_system";
/// Id of the schema metadata document
pub const SCHEMA_DOCUMENT_ID: &str = "schema";
/// Collection holding per-collection config documents
pub const CONFIG_COLLECTION: &str = "_collections";

/// Well-known path of the schema metadata document.
pub fn metadata_path() -> DocumentPath {
    DocumentPath::new(SYSTEM_COLLECTION, SCHEMA_DOCUMENT_ID)
}

/// Well-known path of a collection's config document.
pub fn config_path(collection: &str) -> DocumentPath {
    DocumentPath::new(CONFIG_COLLECTION, collection)
}
