//! storefront - schema core of an e-commerce storefront
//!
//! - `schema`: versioned collection registry, idempotent initializer and
//!   the document validator
//! - `store`: async document store trait with memory and journal backends
//! - `auth`: identity provider capability
//! - `catalog`: account-with-profile and product creation flows
//! - `cli`: the `storefront` command-line tool
//! - `observability`: structured JSON logging

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod observability;
pub mod schema;
pub mod store;
