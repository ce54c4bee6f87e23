//! HTTP handlers

pub mod amendments;
pub mod health;
pub mod hierarchy;
pub mod orders;
pub mod plans;
pub mod reconciliation;

pub use amendments::*;
pub use health::*;
pub use hierarchy::*;
pub use orders::*;
pub use plans::*;
pub use reconciliation::*;
