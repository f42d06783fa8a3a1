//! # Auth Errors
//!
//! Error types for the identity provider capability.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Identity provider errors
#[derive(Debug, Error)]
pub enum AuthError {
    // ==================
    // Account Errors
    // ==================

    /// Email already registered
    #[error("Email already registered")]
    EmailAlreadyInUse,

    /// Email is not syntactically valid
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    // ==================
    // Sign-in Errors
    // ==================

    /// No account for this email or uid
    #[error("User not found")]
    UserNotFound,

    /// Password does not match
    #[error("Wrong password")]
    WrongPassword,

    /// Operation needs a signed-in user
    #[error("No user is signed in")]
    NotSignedIn,

    // ==================
    // Internal Errors
    // ==================

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Account storage failed
    #[error("Identity storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Stable code, in the `auth/<kebab-case>` form clients match on
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthError::InvalidEmail => "auth/invalid-email",
            AuthError::WeakPassword(_) => "auth/weak-password",
            AuthError::UserNotFound => "auth/user-not-found",
            AuthError::WrongPassword => "auth/wrong-password",
            AuthError::NotSignedIn => "auth/no-current-user",
            AuthError::HashingFailed => "auth/internal-error",
            AuthError::Storage(_) => "auth/storage-error",
        }
    }

    /// Whether the caller can fix this by changing its input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::HashingFailed | AuthError::Storage(_))
    }
}
