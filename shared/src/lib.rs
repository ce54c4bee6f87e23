//! Shared types and models for the Storefront Order Management Platform
//!
//! This crate contains the domain model and the pure reconciliation logic
//! shared between the backend, the browser (via WASM), and tests. Nothing in
//! here performs I/O.

pub mod error;
pub mod models;
pub mod order_diff;
pub mod reconcile;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use order_diff::*;
pub use reconcile::*;
pub use types::*;
pub use validation::*;
