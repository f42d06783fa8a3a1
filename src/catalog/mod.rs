//! Storefront flows built on the schema core
//!
//! - `AccountService`: identity account + validated `users` record
//! - `ProductCatalog`: validated `products` records, optional admin gate

mod accounts;
mod errors;
mod products;

pub use accounts::{AccountProfile, AccountService};
pub use errors::{CatalogError, CatalogResult};
pub use products::{ProductCatalog, ProductInput};
