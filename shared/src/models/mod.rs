//! Domain models for the Storefront Order Management Platform

mod amendment;
mod hierarchy;
mod order;
mod reconciliation;
mod user;
mod weekly_plan;

pub use amendment::*;
pub use hierarchy::*;
pub use order::*;
pub use reconciliation::*;
pub use user::*;
pub use weekly_plan::*;
