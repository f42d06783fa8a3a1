//! Identity provider
//!
//! The account-creation flow treats identity as an opaque capability: it
//! creates an account, gets back a stable uid and the signed-in user, and
//! can delete the account again if the profile write fails.
//!
//! `LocalIdentityProvider` keeps accounts in the `_identity` collection of
//! the same document store:
//!
//! - document id is the uid (28 random alphanumerics)
//! - `{email, password_hash, created_at}`, email lowercased
//! - passwords are argon2id hashes, never stored in plaintext

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use super::crypto::{generate_uid, hash_password, normalize_email, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{Document, DocumentPath, DocumentStore, Timestamp, Value, WriteBatch};

/// Collection holding identity accounts
pub const IDENTITY_COLLECTION: &str = "_identity";

/// A signed-in (or freshly created) user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Account management and session capability.
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and makes it the current user.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<AuthUser>> + Send;

    /// Checks credentials and makes the account the current user.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<AuthUser>> + Send;

    /// Clears the current user. No-op when nobody is signed in.
    fn sign_out(&self) -> impl Future<Output = ()> + Send;

    /// The current user, if any.
    fn current_user(&self) -> impl Future<Output = Option<AuthUser>> + Send;

    /// Removes an account. Signs it out if it is the current user.
    fn delete_account(&self, uid: &str) -> impl Future<Output = AuthResult<()>> + Send;
}

/// Identity provider backed by a `DocumentStore`.
pub struct LocalIdentityProvider<S> {
    store: Arc<S>,
    policy: PasswordPolicy,
    current: RwLock<Option<AuthUser>>,
    // serializes the email uniqueness check with the account write
    create_lock: Mutex<()>,
}

impl<S: DocumentStore> LocalIdentityProvider<S> {
    pub fn new(store: Arc<S>, policy: PasswordPolicy) -> Self {
        Self {
            store,
            policy,
            current: RwLock::new(None),
            create_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<(String, Document)>> {
        let accounts = self.store.list_documents(IDENTITY_COLLECTION).await?;
        Ok(accounts
            .into_iter()
            .find(|(_, doc)| doc.get("email").and_then(Value::as_str) == Some(email)))
    }

    async fn become_current(&self, user: &AuthUser) {
        *self.current.write().await = Some(user.clone());
    }
}

fn account_path(uid: &str) -> DocumentPath {
    DocumentPath::new(IDENTITY_COLLECTION, uid)
}

impl<S: DocumentStore> IdentityProvider for LocalIdentityProvider<S> {
    async fn create_account(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let email = normalize_email(email)?;
        self.policy.validate(password)?;

        let _guard = self.create_lock.lock().await;
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let password_hash = hash_password(password)?;
        let uid = generate_uid();

        let mut doc = Document::new();
        doc.insert("email".into(), Value::from(email.as_str()));
        doc.insert("password_hash".into(), Value::from(password_hash));
        doc.insert("created_at".into(), Value::Timestamp(Timestamp::now()));

        let mut batch = WriteBatch::new();
        batch.set(account_path(&uid), doc);
        self.store.batch_write(batch).await?;

        let user = AuthUser { uid, email };
        self.become_current(&user).await;
        log_event_with_fields(Event::AccountCreated, &[("uid", &user.uid)]);
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let email = normalize_email(email)?;
        let (uid, doc) = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let hash = doc
            .get("password_hash")
            .and_then(Value::as_str)
            .ok_or(AuthError::HashingFailed)?;
        if !verify_password(password, hash)? {
            return Err(AuthError::WrongPassword);
        }

        let user = AuthUser { uid, email };
        self.become_current(&user).await;
        log_event_with_fields(Event::SignedIn, &[("uid", &user.uid)]);
        Ok(user)
    }

    async fn sign_out(&self) {
        if let Some(user) = self.current.write().await.take() {
            log_event_with_fields(Event::SignedOut, &[("uid", &user.uid)]);
        }
    }

    async fn current_user(&self) -> Option<AuthUser> {
        self.current.read().await.clone()
    }

    async fn delete_account(&self, uid: &str) -> AuthResult<()> {
        let path = account_path(uid);
        if self.store.read_document(&path).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let mut batch = WriteBatch::new();
        batch.delete(path);
        self.store.batch_write(batch).await?;

        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|user| user.uid == uid) {
            *current = None;
        }
        Ok(())
    }
}
