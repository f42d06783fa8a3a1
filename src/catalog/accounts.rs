//! Account creation with profile
//!
//! Flow:
//! 1. Create the identity account (the user becomes current)
//! 2. Build the `users` record, stamped with the uid and creation time
//! 3. Validate it against the persisted `users` config
//! 4. Persist it at `users/<uid>`
//!
//! If 3 or 4 fails the identity account is deleted again, so an account
//! never exists without its profile.

use std::sync::Arc;

use serde::Deserialize;

use super::errors::{CatalogError, CatalogResult};
use crate::auth::{AuthUser, IdentityProvider};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{DocumentValidator, USERS};
use crate::store::{Document, DocumentPath, DocumentStore, Timestamp, Value, WriteBatch};

/// Profile data supplied at sign-up
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountProfile {
    pub first_name: String,
    pub last_name: String,
    /// Defaults to the local part of the email
    pub username: Option<String>,
    pub age: Option<u32>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub payment_method: Option<String>,
}

impl AccountProfile {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    /// Builds the `users` record for `user`.
    pub fn to_document(&self, user: &AuthUser, now: Timestamp) -> Document {
        let username = self
            .username
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email_local_part(&user.email).to_string());

        let mut doc = Document::new();
        doc.insert("first_name".into(), Value::from(self.first_name.as_str()));
        doc.insert("last_name".into(), Value::from(self.last_name.as_str()));
        doc.insert("username".into(), Value::from(username));
        doc.insert("email".into(), Value::from(user.email.as_str()));
        doc.insert("auth_uid".into(), Value::from(user.uid.as_str()));
        doc.insert("created_at".into(), Value::Timestamp(now));
        doc.insert("updated_at".into(), Value::Timestamp(now));

        if let Some(age) = self.age {
            doc.insert("age".into(), Value::from(age));
        }
        let optional = [
            ("address", &self.address),
            ("image", &self.image),
            ("role", &self.role),
            ("payment_method", &self.payment_method),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                doc.insert(name.into(), Value::from(value.as_str()));
            }
        }
        doc
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Creates accounts and their profile records.
pub struct AccountService<S, P> {
    store: Arc<S>,
    validator: DocumentValidator<S>,
    identity: Arc<P>,
}

impl<S: DocumentStore, P: IdentityProvider> AccountService<S, P> {
    pub fn new(store: Arc<S>, identity: Arc<P>) -> Self {
        Self {
            validator: DocumentValidator::new(Arc::clone(&store)),
            store,
            identity,
        }
    }

    /// Creates an identity account and its validated `users` record.
    ///
    /// Returns the new, signed-in user.
    pub async fn create_account_with_profile(
        &self,
        email: &str,
        password: &str,
        profile: &AccountProfile,
    ) -> CatalogResult<AuthUser> {
        let user = self.identity.create_account(email, password).await?;
        let doc = profile.to_document(&user, Timestamp::now());

        if let Err(err) = self.persist_profile(&user, doc).await {
            self.roll_back(&user, &err).await;
            return Err(err);
        }
        Ok(user)
    }

    /// The `users` record of `uid`, if any.
    pub async fn profile(&self, uid: &str) -> CatalogResult<Option<Document>> {
        Ok(self
            .store
            .read_document(&DocumentPath::new(USERS, uid))
            .await?)
    }

    async fn persist_profile(&self, user: &AuthUser, doc: Document) -> CatalogResult<()> {
        self.validator.validate(USERS, &doc).await?;

        let mut batch = WriteBatch::new();
        batch.set(DocumentPath::new(USERS, user.uid.as_str()), doc);
        self.store.batch_write(batch).await?;
        Ok(())
    }

    async fn roll_back(&self, user: &AuthUser, cause: &CatalogError) {
        let outcome = match self.identity.delete_account(&user.uid).await {
            Ok(()) => "deleted".to_string(),
            Err(err) => format!("delete failed: {}", err),
        };
        log_event_with_fields(
            Event::AccountRolledBack,
            &[
                ("cause", &cause.to_string()),
                ("outcome", &outcome),
                ("uid", &user.uid),
            ],
        );
    }
}
