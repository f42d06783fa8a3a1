//! Schema Invariant Tests
//!
//! Validation rules checked through the public API, against configs
//! persisted by the initializer:
//! - All violations are reported, in field declaration order
//! - Undeclared fields are ignored
//! - A required empty string is missing, not mistyped
//! - Validation is deterministic

use std::sync::Arc;

use storefront::schema::{
    CollectionConfig, DocumentValidator, FieldConfig, FieldType, SchemaError, SchemaInitializer,
    SchemaRegistry, Violation,
};
use storefront::store::{document_from_json, Document, MemoryStore};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn accounts() -> CollectionConfig {
    CollectionConfig::new()
        .field("handle", FieldConfig::required(FieldType::String))
        .field("age", FieldConfig::optional(FieldType::Number))
}

fn orders() -> CollectionConfig {
    CollectionConfig::new()
        .field("customer", FieldConfig::required(FieldType::String))
        .field("total", FieldConfig::required(FieldType::Number))
        .field("gift", FieldConfig::optional(FieldType::Boolean))
        .field("placed_at", FieldConfig::optional(FieldType::Timestamp))
}

async fn setup_validator() -> DocumentValidator<MemoryStore> {
    let registry = SchemaRegistry::new(1, vec![("accounts", accounts()), ("orders", orders())]).unwrap();
    let store = Arc::new(MemoryStore::new());
    SchemaInitializer::new(Arc::new(registry), Arc::clone(&store))
        .ensure_schema_applied()
        .await
        .unwrap();
    DocumentValidator::new(store)
}

fn record(value: serde_json::Value) -> Document {
    document_from_json(value).unwrap()
}

fn messages(err: &SchemaError) -> Vec<String> {
    err.violations()
        .unwrap()
        .iter()
        .map(Violation::to_string)
        .collect()
}

// =============================================================================
// Completeness & Ordering
// =============================================================================

/// Two missing required fields and one mistyped optional field give
/// exactly three violations, in declaration order.
#[tokio::test]
async fn test_all_violations_reported_in_declaration_order() {
    let validator = setup_validator().await;

    let err = validator
        .validate("orders", &record(json!({"gift": "yes"})))
        .await
        .unwrap_err();

    assert_eq!(
        messages(&err),
        vec![
            "field customer is required",
            "field total is required",
            "field gift must be of type boolean",
        ]
    );
}

/// Declaration order wins over the order keys appear in the record.
#[tokio::test]
async fn test_order_independent_of_record_keys() {
    let validator = setup_validator().await;

    let err = validator
        .validate("orders", &record(json!({"gift": 1, "total": "ten", "customer": ""})))
        .await
        .unwrap_err();

    assert_eq!(
        messages(&err),
        vec![
            "field customer is required",
            "field total must be of type number",
            "field gift must be of type boolean",
        ]
    );
}

// =============================================================================
// Permissiveness
// =============================================================================

/// Extra undeclared fields are ignored.
#[tokio::test]
async fn test_undeclared_fields_ignored() {
    let validator = setup_validator().await;

    let ok = validator
        .validate(
            "orders",
            &record(json!({"customer": "chris", "total": 12.5, "coupon": "SPRING"})),
        )
        .await
        .unwrap();
    assert!(ok);
}

/// Both timestamp representations satisfy a timestamp field.
#[tokio::test]
async fn test_timestamp_accepts_both_representations() {
    let validator = setup_validator().await;

    for placed_at in [
        json!({"$date": "2024-05-01T10:00:00Z"}),
        json!({"$timestamp": {"seconds": 1714557600, "nanos": 0}}),
    ] {
        let rec = record(json!({"customer": "chris", "total": 1, "placed_at": placed_at}));
        assert!(validator.validate("orders", &rec).await.unwrap());
    }

    let rec = record(json!({"customer": "chris", "total": 1, "placed_at": "2024-05-01"}));
    let err = validator.validate("orders", &rec).await.unwrap_err();
    assert_eq!(messages(&err), vec!["field placed_at must be of type timestamp"]);
}

// =============================================================================
// Empty String Rule
// =============================================================================

/// A required field given as "" is a required-violation, not a type one.
#[tokio::test]
async fn test_required_empty_string_is_missing() {
    let validator = setup_validator().await;

    let err = validator
        .validate("accounts", &record(json!({"handle": ""})))
        .await
        .unwrap_err();
    assert_eq!(messages(&err), vec!["field handle is required"]);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_accounts_scenario() {
    let validator = setup_validator().await;

    let err = validator
        .validate("accounts", &record(json!({"handle": "", "age": "nineteen"})))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "field handle is required\nfield age must be of type number"
    );

    assert!(validator
        .validate("accounts", &record(json!({"handle": "chris"})))
        .await
        .unwrap());
}

/// Same record validates the same way every time.
#[tokio::test]
async fn test_validation_is_deterministic() {
    let validator = setup_validator().await;
    let bad = record(json!({"handle": 3, "age": true}));

    let first = messages(&validator.validate("accounts", &bad).await.unwrap_err());
    for _ in 0..50 {
        let again = messages(&validator.validate("accounts", &bad).await.unwrap_err());
        assert_eq!(again, first);
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_collection_not_configured() {
    let validator = setup_validator().await;

    let err = validator
        .validate("invoices", &record(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::CollectionNotConfigured { .. }));
    assert_eq!(err.code(), "SCHEMA_COLLECTION_NOT_CONFIGURED");
}

#[test]
fn test_registry_rejects_duplicate_collections() {
    let err = SchemaRegistry::new(1, vec![("accounts", accounts()), ("accounts", orders())]).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidRegistry(_)));
}

#[test]
fn test_registry_lookup() {
    let registry = SchemaRegistry::storefront();
    assert_eq!(registry.version(), 2);
    assert_eq!(registry.collection_names(), vec!["users", "products"]);
    assert!(registry.collection("users").unwrap().get("auth_uid").unwrap().required);
    assert!(matches!(
        registry.collection("orders"),
        Err(SchemaError::NotConfigured { .. })
    ));
}
