//! Schema registry
//!
//! The registry is compiled-in, immutable data: a version number and the
//! ordered collection declarations it stands for. It is shared read-only
//! (behind an `Arc`) by the initializer and anything else that needs it.
//!
//! The version must strictly increase whenever any field config changes.

use super::errors::{SchemaError, SchemaResult};
use super::types::{CollectionConfig, FieldConfig, FieldType};

/// Collection holding user profiles
pub const USERS: &str = "users";
/// Collection holding catalog products
pub const PRODUCTS: &str = "products";

/// Version of the compiled-in storefront schema
pub const STOREFRONT_SCHEMA_VERSION: u32 = 2;

/// Versioned set of collection declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    version: u32,
    collections: Vec<(String, CollectionConfig)>,
}

impl SchemaRegistry {
    /// Creates a registry after checking its structure.
    ///
    /// Rejects version 0 (reserved for "nothing applied"), duplicate
    /// collection or field names, and indexes over undeclared fields.
    pub fn new(
        version: u32,
        collections: Vec<(impl Into<String>, CollectionConfig)>,
    ) -> SchemaResult<Self> {
        let registry = Self {
            version,
            collections: collections
                .into_iter()
                .map(|(name, config)| (name.into(), config))
                .collect(),
        };
        registry.check_structure()?;
        Ok(registry)
    }

    /// The storefront schema: `users` and `products`.
    pub fn storefront() -> Self {
        let users = CollectionConfig::new()
            .field("first_name", FieldConfig::required(FieldType::String))
            .field("last_name", FieldConfig::required(FieldType::String))
            .field("username", FieldConfig::required(FieldType::String).unique())
            .field("email", FieldConfig::required(FieldType::String).unique())
            .field("age", FieldConfig::optional(FieldType::Number))
            .field("address", FieldConfig::optional(FieldType::String))
            .field("image", FieldConfig::optional(FieldType::String))
            // admin, customer, seller, ...
            .field("role", FieldConfig::optional(FieldType::String))
            .field("payment_method", FieldConfig::optional(FieldType::String))
            .field("auth_uid", FieldConfig::required(FieldType::String))
            .field("created_at", FieldConfig::required(FieldType::Timestamp))
            .field("updated_at", FieldConfig::required(FieldType::Timestamp))
            .index(&["username"], true)
            .index(&["email"], true)
            .index(&["auth_uid"], true);

        let products = CollectionConfig::new()
            .field("name", FieldConfig::required(FieldType::String))
            .field("description", FieldConfig::required(FieldType::String))
            .field("price", FieldConfig::required(FieldType::Number))
            .field("quantity", FieldConfig::required(FieldType::Number))
            .field("image", FieldConfig::optional(FieldType::String))
            // true = active
            .field("status", FieldConfig::required(FieldType::Boolean))
            .field("size", FieldConfig::optional(FieldType::String))
            .field("color", FieldConfig::optional(FieldType::String))
            .field("tier", FieldConfig::optional(FieldType::String))
            .field("style", FieldConfig::optional(FieldType::String))
            .field("garment_type", FieldConfig::optional(FieldType::String))
            .field("brand", FieldConfig::optional(FieldType::String))
            .field("created_at", FieldConfig::required(FieldType::Timestamp))
            .field("updated_at", FieldConfig::required(FieldType::Timestamp));

        Self {
            version: STOREFRONT_SCHEMA_VERSION,
            collections: vec![(USERS.to_string(), users), (PRODUCTS.to_string(), products)],
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Looks up a collection declaration by name.
    pub fn collection(&self, name: &str) -> SchemaResult<&CollectionConfig> {
        self.collections
            .iter()
            .find(|(collection, _)| collection == name)
            .map(|(_, config)| config)
            .ok_or_else(|| SchemaError::NotConfigured {
                collection: name.to_string(),
            })
    }

    /// Collection names in declaration order.
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// All declarations in order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &CollectionConfig)> {
        self.collections
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    fn check_structure(&self) -> SchemaResult<()> {
        if self.version == 0 {
            return Err(SchemaError::InvalidRegistry(
                "schema version must be at least 1".into(),
            ));
        }

        for (i, (name, config)) in self.collections.iter().enumerate() {
            if name.is_empty() {
                return Err(SchemaError::InvalidRegistry(
                    "collection name must not be empty".into(),
                ));
            }
            if self.collections[..i].iter().any(|(other, _)| other == name) {
                return Err(SchemaError::InvalidRegistry(format!(
                    "collection '{}' declared twice",
                    name
                )));
            }
            config
                .check_structure(name)
                .map_err(SchemaError::InvalidRegistry)?;
        }

        Ok(())
    }
}
