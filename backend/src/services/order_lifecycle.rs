//! Order lifecycle: review gate, customer decision, cancellation

use serde::Serialize;
use shared::{
    order_totals, NewOrderHistory, Order, OrderHistoryEntry, OrderItem, OrderItemHistoryEntry,
    OrderStatus,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// An order with its current lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One audit session with its per-line changes
#[derive(Debug, Clone, Serialize)]
pub struct HistorySession {
    #[serde(flatten)]
    pub entry: OrderHistoryEntry,
    pub changes: Vec<OrderItemHistoryEntry>,
}

/// Moves orders between statuses and records each move
#[derive(Clone)]
pub struct OrderLifecycleService {
    store: SharedStore,
}

impl OrderLifecycleService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = self.find(order_id).await?;
        let items = self.store.order_items(order_id).await?;
        Ok(OrderDetail { order, items })
    }

    /// pending -> review without changing any line
    pub async fn mark_for_review(
        &self,
        order_id: Uuid,
        actor: &str,
        notes: Option<String>,
    ) -> AppResult<Order> {
        self.transition(order_id, actor, OrderStatus::Review, notes).await
    }

    /// review -> completed
    pub async fn accept(&self, order_id: Uuid, actor: &str) -> AppResult<Order> {
        self.transition(order_id, actor, OrderStatus::Completed, None)
            .await
    }

    /// Cancel from any non-terminal status
    pub async fn cancel(
        &self,
        order_id: Uuid,
        actor: &str,
        notes: Option<String>,
    ) -> AppResult<Order> {
        self.transition(order_id, actor, OrderStatus::Cancelled, notes)
            .await
    }

    /// review -> pending, restoring the lines captured by the latest edit.
    ///
    /// The snapshot is the `original_items` of the most recent history session
    /// whose new status is review. After two edits in review that is the state
    /// left by the first edit, not the state before review began.
    pub async fn reject(
        &self,
        order_id: Uuid,
        actor: &str,
        notes: Option<String>,
    ) -> AppResult<Order> {
        let order = self.find(order_id).await?;
        order.status.transition(OrderStatus::Pending)?;

        let snapshot = self
            .store
            .order_history(order_id)
            .await?
            .into_iter()
            .find(|h| h.new_status == OrderStatus::Review)
            .ok_or_else(|| AppError::NotFound("Review snapshot".to_string()))?;

        let current = self.store.order_items(order_id).await?;
        let (restored_quantity, restored_value) = order_totals(&snapshot.original_items)?;

        self.store
            .insert_history(NewOrderHistory {
                order_id,
                previous_status: order.status,
                new_status: OrderStatus::Pending,
                previous_quantity: order.quantity,
                new_quantity: restored_quantity,
                previous_value: order.value,
                new_value: restored_value,
                notes,
                changed_by: actor.to_string(),
                original_items: current.clone(),
            })
            .await
            .map_err(|e| AppError::AuditSessionFailed(e.to_string()))?;

        let ids: Vec<Uuid> = current.iter().map(|i| i.id).collect();
        self.store.delete_items(&ids).await?;
        self.store.restore_items(&snapshot.original_items).await?;

        let order = self
            .store
            .update_order_summary(
                order_id,
                restored_quantity,
                restored_value,
                OrderStatus::Pending,
            )
            .await?;

        tracing::info!(
            order_id = %order_id,
            snapshot = %snapshot.id,
            restored_lines = snapshot.original_items.len(),
            "Order edit rejected; previous lines restored"
        );

        Ok(order)
    }

    /// Audit sessions for an order, newest first, each with its line changes
    pub async fn history(&self, order_id: Uuid) -> AppResult<Vec<HistorySession>> {
        self.find(order_id).await?;
        let entries = self.store.order_history(order_id).await?;

        let mut sessions = Vec::with_capacity(entries.len());
        for entry in entries {
            let changes = self.store.item_history(entry.id).await?;
            sessions.push(HistorySession { entry, changes });
        }
        Ok(sessions)
    }

    async fn find(&self, order_id: Uuid) -> AppResult<Order> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    async fn transition(
        &self,
        order_id: Uuid,
        actor: &str,
        next: OrderStatus,
        notes: Option<String>,
    ) -> AppResult<Order> {
        let order = self.find(order_id).await?;
        order.status.transition(next)?;

        let items = self.store.order_items(order_id).await?;
        self.store
            .insert_history(NewOrderHistory {
                order_id,
                previous_status: order.status,
                new_status: next,
                previous_quantity: order.quantity,
                new_quantity: order.quantity,
                previous_value: order.value,
                new_value: order.value,
                notes,
                changed_by: actor.to_string(),
                original_items: items,
            })
            .await
            .map_err(|e| AppError::AuditSessionFailed(e.to_string()))?;

        let updated = self
            .store
            .update_order_summary(order_id, order.quantity, order.value, next)
            .await?;

        tracing::info!(
            order_id = %order_id,
            from = %order.status,
            to = %next,
            "Order status changed"
        );

        Ok(updated)
    }
}
