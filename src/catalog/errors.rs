//! Catalog flow errors

use thiserror::Error;

use crate::auth::AuthError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for catalog flows
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors surfaced by account and product flows
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Record rejected or schema not available
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Identity provider refused or failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Persisting or reading records failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Product creation is restricted to the configured admin
    #[error("only the store administrator can create products")]
    NotAdmin,
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Schema(err) => err.code(),
            CatalogError::Auth(err) => err.code(),
            CatalogError::Store(err) => err.code(),
            CatalogError::NotAdmin => "CATALOG_NOT_ADMIN",
        }
    }
}
