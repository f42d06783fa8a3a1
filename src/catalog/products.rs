//! Product catalog
//!
//! Products are validated against the persisted `products` config before
//! they are written; a rejected product is never persisted. When an admin
//! email is configured only that user may add products.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::errors::{CatalogError, CatalogResult};
use crate::auth::AuthUser;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{DocumentValidator, PRODUCTS};
use crate::store::{Document, DocumentPath, DocumentStore, Timestamp, Value, WriteBatch};

/// Product data supplied by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    /// `true` when the product is listed
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub garment_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

fn default_status() -> bool {
    true
}

impl ProductInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
            quantity,
            image: None,
            status: true,
            size: None,
            color: None,
            tier: None,
            style: None,
            garment_type: None,
            brand: None,
        }
    }

    /// Builds the `products` record with both timestamps set to `now`.
    pub fn to_document(&self, now: Timestamp) -> Document {
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from(self.name.as_str()));
        doc.insert("description".into(), Value::from(self.description.as_str()));
        doc.insert("price".into(), Value::from(self.price));
        doc.insert("quantity".into(), Value::from(self.quantity));
        doc.insert("status".into(), Value::from(self.status));
        doc.insert("created_at".into(), Value::Timestamp(now));
        doc.insert("updated_at".into(), Value::Timestamp(now));

        let optional = [
            ("image", &self.image),
            ("size", &self.size),
            ("color", &self.color),
            ("tier", &self.tier),
            ("style", &self.style),
            ("garment_type", &self.garment_type),
            ("brand", &self.brand),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                doc.insert(name.into(), Value::from(value.as_str()));
            }
        }
        doc
    }
}

/// Creates and lists products.
pub struct ProductCatalog<S> {
    store: Arc<S>,
    validator: DocumentValidator<S>,
    admin_email: Option<String>,
}

impl<S: DocumentStore> ProductCatalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            validator: DocumentValidator::new(Arc::clone(&store)),
            store,
            admin_email: None,
        }
    }

    /// Restricts `create_product_as` to the user with this email.
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into().trim().to_lowercase());
        self
    }

    /// Validates and persists a product; returns its generated id.
    pub async fn create_product(&self, input: &ProductInput) -> CatalogResult<String> {
        self.create_product_record(input.to_document(Timestamp::now()))
            .await
    }

    /// Validates and persists a raw product record.
    ///
    /// `created_at` and `updated_at` are stamped here, replacing any
    /// values in `record`; every other field is validated as given.
    pub async fn create_product_record(&self, mut record: Document) -> CatalogResult<String> {
        let now = Value::Timestamp(Timestamp::now());
        record.insert("created_at".into(), now.clone());
        record.insert("updated_at".into(), now);
        self.validator.validate(PRODUCTS, &record).await?;

        let name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = Uuid::new_v4().to_string();
        let mut batch = WriteBatch::new();
        batch.set(DocumentPath::new(PRODUCTS, id.as_str()), record);
        self.store.batch_write(batch).await?;

        log_event_with_fields(Event::ProductCreated, &[("id", &id), ("name", &name)]);
        Ok(id)
    }

    /// `create_product` on behalf of `actor`, enforcing the admin gate.
    pub async fn create_product_as(
        &self,
        actor: Option<&AuthUser>,
        input: &ProductInput,
    ) -> CatalogResult<String> {
        self.authorize(actor)?;
        self.create_product(input).await
    }

    /// `create_product_record` on behalf of `actor`, enforcing the admin gate.
    pub async fn create_product_record_as(
        &self,
        actor: Option<&AuthUser>,
        record: Document,
    ) -> CatalogResult<String> {
        self.authorize(actor)?;
        self.create_product_record(record).await
    }

    fn authorize(&self, actor: Option<&AuthUser>) -> CatalogResult<()> {
        let Some(admin) = &self.admin_email else {
            return Ok(());
        };
        if actor.is_some_and(|user| user.email.eq_ignore_ascii_case(admin)) {
            return Ok(());
        }

        let who = actor.map(|user| user.email.as_str()).unwrap_or("anonymous");
        log_event_with_fields(Event::ProductRefused, &[("actor", who)]);
        Err(CatalogError::NotAdmin)
    }

    /// All products, ordered by id.
    pub async fn list_products(&self) -> CatalogResult<Vec<(String, Document)>> {
        Ok(self.store.list_documents(PRODUCTS).await?)
    }
}
