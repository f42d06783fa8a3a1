//! Schema type definitions
//!
//! Supported field types:
//! - string: UTF-8 string
//! - number: 64-bit floating point
//! - boolean: true/false
//! - timestamp: store timestamp or native date
//!
//! The set is closed; adding a type is a registry change.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use crate::store::{Document, Timestamp, Value};

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Timestamp,
}

impl FieldType {
    /// Returns the type name used in persisted configs and messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "timestamp" => Some(FieldType::Timestamp),
            _ => None,
        }
    }

    /// Whether a non-null value has this type.
    ///
    /// Numbers must be finite. Timestamps accept both the store
    /// representation and native dates,
    /// since callers may hand over either before persistence.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => matches!(value, Value::String(_)),
            // NaN and infinities cannot be persisted
            FieldType::Number => matches!(value, Value::Number(n) if n.is_finite()),
            FieldType::Boolean => matches!(value, Value::Boolean(_)),
            FieldType::Timestamp => matches!(value, Value::Timestamp(_) | Value::DateTime(_)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Contract of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldConfig {
    pub field_type: FieldType,
    /// Must be present, non-null and (for strings) non-empty
    pub required: bool,
    /// Advisory; uniqueness is left to the backend's own constraints
    pub unique: Option<bool>,
}

impl FieldConfig {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            unique: None,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            unique: None,
        }
    }

    /// Marks the field as declared-unique.
    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }
}

/// Advisory index declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDecl {
    pub fields: Vec<String>,
    pub unique: bool,
}

/// Field rules and index declarations of one collection.
///
/// Field declaration order is preserved; it is the order violations are
/// reported in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    fields: Vec<(String, FieldConfig)>,
    indexes: Vec<IndexDecl>,
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field. Redeclaring a name is caught by registry checks.
    pub fn field(mut self, name: impl Into<String>, config: FieldConfig) -> Self {
        self.fields.push((name.into(), config));
        self
    }

    /// Declares an advisory index.
    pub fn index(mut self, fields: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexDecl {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique,
        });
        self
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldConfig)> {
        self.fields.iter().map(|(name, cfg)| (name.as_str(), cfg))
    }

    pub fn get(&self, name: &str) -> Option<&FieldConfig> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, cfg)| cfg)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn indexes(&self) -> &[IndexDecl] {
        &self.indexes
    }

    /// Structural rules: unique field names, indexes over declared fields.
    pub(crate) fn check_structure(&self, collection: &str) -> Result<(), String> {
        for (i, (name, _)) in self.fields.iter().enumerate() {
            if name.is_empty() {
                return Err(format!("collection '{}' declares an empty field name", collection));
            }
            if self.fields[..i].iter().any(|(other, _)| other == name) {
                return Err(format!(
                    "collection '{}' declares field '{}' twice",
                    collection, name
                ));
            }
        }

        for index in &self.indexes {
            if index.fields.is_empty() {
                return Err(format!("collection '{}' declares an empty index", collection));
            }
            if let Some(missing) = index.fields.iter().find(|f| self.get(f).is_none()) {
                return Err(format!(
                    "collection '{}' indexes undeclared field '{}'",
                    collection, missing
                ));
            }
        }

        Ok(())
    }

    /// The `{fields, indexes}` declaration as a store value.
    ///
    /// `fields` is an array of `{name, type, required[, unique]}` entries so
    /// declaration order survives persistence.
    pub fn to_value(&self) -> Value {
        let fields = self
            .fields
            .iter()
            .map(|(name, cfg)| {
                let mut entry = BTreeMap::new();
                entry.insert("name".to_string(), Value::from(name.as_str()));
                entry.insert("type".to_string(), Value::from(cfg.field_type.type_name()));
                entry.insert("required".to_string(), Value::Boolean(cfg.required));
                if let Some(unique) = cfg.unique {
                    entry.insert("unique".to_string(), Value::Boolean(unique));
                }
                Value::Map(entry)
            })
            .collect();

        let indexes = self
            .indexes
            .iter()
            .map(|index| {
                let mut entry = BTreeMap::new();
                entry.insert(
                    "fields".to_string(),
                    Value::Array(index.fields.iter().map(|f| Value::from(f.as_str())).collect()),
                );
                entry.insert("unique".to_string(), Value::Boolean(index.unique));
                Value::Map(entry)
            })
            .collect();

        let mut map = BTreeMap::new();
        map.insert("fields".to_string(), Value::Array(fields));
        map.insert("indexes".to_string(), Value::Array(indexes));
        Value::Map(map)
    }

    /// Persisted config document: the declaration plus `created_at`.
    pub fn to_document(&self, created_at: Timestamp) -> Document {
        let mut doc = match self.to_value() {
            Value::Map(map) => map,
            _ => Document::new(),
        };
        doc.insert("created_at".to_string(), Value::Timestamp(created_at));
        doc
    }

    /// Rebuilds a config from its persisted document.
    pub fn from_document(collection: &str, doc: &Document) -> SchemaResult<Self> {
        let malformed = |reason: String| SchemaError::MalformedConfig {
            collection: collection.to_string(),
            reason,
        };

        let entries = doc
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing 'fields' array".into()))?;

        let mut config = CollectionConfig::new();
        for (i, entry) in entries.iter().enumerate() {
            let entry = entry
                .as_map()
                .ok_or_else(|| malformed(format!("fields[{}] is not a map", i)))?;

            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(format!("fields[{}] has no name", i)))?;

            let type_name = entry
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(format!("field '{}' has no type", name)))?;
            let field_type = FieldType::parse(type_name)
                .ok_or_else(|| malformed(format!("field '{}' has unknown type '{}'", name, type_name)))?;

            let required = entry
                .get("required")
                .and_then(Value::as_bool)
                .ok_or_else(|| malformed(format!("field '{}' has no required flag", name)))?;

            let unique = entry.get("unique").and_then(Value::as_bool);

            config.fields.push((
                name.to_string(),
                FieldConfig {
                    field_type,
                    required,
                    unique,
                },
            ));
        }

        if let Some(indexes) = doc.get("indexes").and_then(Value::as_array) {
            for (i, entry) in indexes.iter().enumerate() {
                let entry = entry
                    .as_map()
                    .ok_or_else(|| malformed(format!("indexes[{}] is not a map", i)))?;
                let fields = entry
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| malformed(format!("indexes[{}] has no fields", i)))?
                    .iter()
                    .map(|f| f.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| malformed(format!("indexes[{}] has a non-string field", i)))?;
                let unique = entry.get("unique").and_then(Value::as_bool).unwrap_or(false);
                config.indexes.push(IndexDecl { fields, unique });
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn accounts() -> CollectionConfig {
        CollectionConfig::new()
            .field("handle", FieldConfig::required(FieldType::String).unique())
            .field("age", FieldConfig::optional(FieldType::Number))
            .index(&["handle"], true)
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::String.type_name(), "string");
        assert_eq!(FieldType::Number.type_name(), "number");
        assert_eq!(FieldType::Boolean.type_name(), "boolean");
        assert_eq!(FieldType::Timestamp.type_name(), "timestamp");
        assert_eq!(FieldType::parse("timestamp"), Some(FieldType::Timestamp));
        assert_eq!(FieldType::parse("int"), None);
    }

    #[test]
    fn test_timestamp_accepts_both_representations() {
        assert!(FieldType::Timestamp.accepts(&Value::Timestamp(Timestamp::now())));
        assert!(FieldType::Timestamp.accepts(&Value::DateTime(Utc::now())));
        assert!(!FieldType::Timestamp.accepts(&Value::from("2024-01-01")));
    }

    #[test]
    fn test_no_cross_type_acceptance() {
        assert!(!FieldType::Number.accepts(&Value::from("19")));
        assert!(!FieldType::String.accepts(&Value::Number(1.0)));
        assert!(!FieldType::Boolean.accepts(&Value::Number(1.0)));
    }

    #[test]
    fn test_number_rejects_non_finite() {
        assert!(FieldType::Number.accepts(&Value::Number(0.0)));
        assert!(!FieldType::Number.accepts(&Value::Number(f64::NAN)));
        assert!(!FieldType::Number.accepts(&Value::Number(f64::INFINITY)));
        assert!(!FieldType::Number.accepts(&Value::Number(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_declaration_order_survives_document_form() {
        let config = accounts();
        let doc = config.to_document(Timestamp::now());
        let restored = CollectionConfig::from_document("accounts", &doc).unwrap();

        assert_eq!(restored, config);
        let names: Vec<&str> = restored.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["handle", "age"]);
    }

    #[test]
    fn test_document_carries_created_at() {
        let ts = Timestamp::now();
        let doc = accounts().to_document(ts);
        assert_eq!(doc.get("created_at"), Some(&Value::Timestamp(ts)));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let mut doc = accounts().to_document(Timestamp::now());
        let mut entry = BTreeMap::new();
        entry.insert("name".to_string(), Value::from("x"));
        entry.insert("type".to_string(), Value::from("decimal"));
        entry.insert("required".to_string(), Value::Boolean(false));
        doc.insert("fields".into(), Value::Array(vec![Value::Map(entry)]));

        let err = CollectionConfig::from_document("accounts", &doc).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedConfig { .. }));
        assert!(err.to_string().contains("decimal"));
    }

    #[test]
    fn test_missing_fields_is_malformed() {
        let err = CollectionConfig::from_document("accounts", &Document::new()).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedConfig { .. }));
    }

    #[test]
    fn test_structure_rejects_duplicate_field() {
        let config = CollectionConfig::new()
            .field("a", FieldConfig::optional(FieldType::String))
            .field("a", FieldConfig::optional(FieldType::Number));
        assert!(config.check_structure("c").unwrap_err().contains("twice"));
    }

    #[test]
    fn test_structure_rejects_index_on_undeclared_field() {
        let config = CollectionConfig::new()
            .field("a", FieldConfig::optional(FieldType::String))
            .index(&["b"], true);
        assert!(config.check_structure("c").unwrap_err().contains("'b'"));
    }
}
