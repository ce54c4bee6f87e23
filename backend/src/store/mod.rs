//! Datastore access
//!
//! Services talk to the relational store only through these traits so the
//! reconciliation and order-edit logic can run against the PostgreSQL
//! implementation in production and an in-memory one in tests.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    AmendmentRecord, AmendmentStatus, ItemChange, ManagerRole, NewOrderHistory, NewOrderItem,
    Order, OrderHistoryEntry, OrderItem, OrderItemHistoryEntry, OrderItemUpdate, OrderStatus,
    PageRequest, StoreHierarchy, SubmissionRecord, UserProfile, WeekSelection, WeeklyPlanLine,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod postgres;

pub use postgres::PgStore;

/// Store hierarchy and user lookups
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    /// Hierarchy rows where `user_id` occupies the `role` column, ordered by store name
    async fn stores_for_manager(
        &self,
        role: ManagerRole,
        user_id: &str,
    ) -> AppResult<Vec<StoreHierarchy>>;

    async fn find_user_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>>;
}

/// Weekly plan batches
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_week(&self, reference: &str) -> AppResult<Option<WeekSelection>>;

    async fn upsert_week(&self, week: &WeekSelection) -> AppResult<WeekSelection>;

    /// One page of lines for `reference` restricted to `store_names`, ordered by store name
    async fn plan_lines_page(
        &self,
        reference: &str,
        store_names: &[String],
        page: PageRequest,
    ) -> AppResult<Vec<WeeklyPlanLine>>;

    async fn count_plan_lines(&self, reference: &str, store_names: &[String]) -> AppResult<i64>;

    /// Every line of a batch, regardless of store
    async fn all_plan_lines(&self, reference: &str) -> AppResult<Vec<WeeklyPlanLine>>;

    async fn delete_plan_lines(&self, reference: &str) -> AppResult<u64>;

    async fn insert_plan_lines(&self, lines: &[WeeklyPlanLine]) -> AppResult<u64>;
}

/// Fields of an amendment being created
#[derive(Debug, Clone)]
pub struct NewAmendment {
    pub reference: String,
    pub store_id: Uuid,
    pub stock_code: String,
    pub amended_qty: i32,
    pub justification: String,
    pub status: AmendmentStatus,
    pub created_by: String,
    pub created_by_role: ManagerRole,
}

/// Fields of a submission marker being created
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub reference: String,
    pub store_id: Uuid,
    pub status: AmendmentStatus,
    pub submitted_by: String,
    pub submitted_by_role: ManagerRole,
}

/// Amendments and submissions
#[async_trait]
pub trait AmendmentRepository: Send + Sync {
    async fn amendments_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<AmendmentRecord>>;

    async fn submissions_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<SubmissionRecord>>;

    async fn find_amendment(&self, id: Uuid) -> AppResult<Option<AmendmentRecord>>;

    async fn find_amendment_for(
        &self,
        reference: &str,
        store_id: Uuid,
        stock_code: &str,
    ) -> AppResult<Option<AmendmentRecord>>;

    async fn insert_amendment(&self, amendment: NewAmendment) -> AppResult<AmendmentRecord>;

    /// Persist quantity, justification, status, and admin fields of `amendment`
    async fn update_amendment(&self, amendment: &AmendmentRecord) -> AppResult<AmendmentRecord>;

    /// Move every amendment of a store and week in status `from` to `to`
    async fn set_amendment_status(
        &self,
        reference: &str,
        store_id: Uuid,
        from: AmendmentStatus,
        to: AmendmentStatus,
    ) -> AppResult<u64>;

    async fn insert_submission(&self, submission: NewSubmission) -> AppResult<SubmissionRecord>;

    async fn delete_submissions(&self, reference: &str, store_id: Uuid) -> AppResult<u64>;

    async fn delete_amendments(&self, reference: &str, store_id: Uuid) -> AppResult<u64>;
}

/// Orders, their items, and the audit trail
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>>;

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;

    async fn insert_history(&self, entry: NewOrderHistory) -> AppResult<OrderHistoryEntry>;

    async fn insert_items(&self, items: &[NewOrderItem]) -> AppResult<Vec<OrderItem>>;

    /// Re-insert items with their original ids
    async fn restore_items(&self, items: &[OrderItem]) -> AppResult<u64>;

    async fn update_item(&self, update: &OrderItemUpdate) -> AppResult<()>;

    async fn delete_items(&self, item_ids: &[Uuid]) -> AppResult<u64>;

    async fn insert_item_history(
        &self,
        history_id: Uuid,
        order_id: Uuid,
        changes: &[ItemChange],
    ) -> AppResult<Vec<OrderItemHistoryEntry>>;

    async fn update_order_summary(
        &self,
        order_id: Uuid,
        quantity: i32,
        value: Decimal,
        status: OrderStatus,
    ) -> AppResult<Order>;

    /// History sessions for an order, newest first
    async fn order_history(&self, order_id: Uuid) -> AppResult<Vec<OrderHistoryEntry>>;

    async fn item_history(&self, history_id: Uuid) -> AppResult<Vec<OrderItemHistoryEntry>>;
}

/// Datastore connectivity for the health endpoint
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// Everything the services need from the datastore
pub trait Datastore:
    HierarchyRepository + PlanRepository + AmendmentRepository + OrderRepository + StoreHealth
{
}

impl<T> Datastore for T where
    T: HierarchyRepository + PlanRepository + AmendmentRepository + OrderRepository + StoreHealth
{
}

pub type SharedStore = Arc<dyn Datastore>;

