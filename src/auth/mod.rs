//! # Auth Module
//!
//! Identity capability used by the account-creation flow and the CLI:
//! account creation, sign-in/out and account removal, with argon2id
//! password hashing.

pub mod crypto;
pub mod errors;
pub mod identity;

pub use crypto::PasswordPolicy;
pub use errors::{AuthError, AuthResult};
pub use identity::{AuthUser, IdentityProvider, LocalIdentityProvider, IDENTITY_COLLECTION};
