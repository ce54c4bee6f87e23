//! Business logic services for the Storefront Order Management Platform

pub mod amendment;
pub mod bulk_fetch;
pub mod cache;
pub mod hierarchy;
pub mod order_edit;
pub mod order_lifecycle;
pub mod plan_upload;
pub mod reconciliation;

pub use amendment::AmendmentService;
pub use cache::{CacheKey, ReconciliationCache};
pub use hierarchy::HierarchyService;
pub use order_edit::OrderEditService;
pub use order_lifecycle::OrderLifecycleService;
pub use plan_upload::PlanUploadService;
pub use reconciliation::{ProgressReporter, ReconciliationService};
