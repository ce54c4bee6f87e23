//! Order edit engine
//!
//! Applies an admin's edit of an order's lines. The steps run in a fixed
//! order without a transaction:
//!
//! 1. open an audit session (fatal on failure, nothing else is attempted)
//! 2. insert new lines, update changed lines, delete removed lines
//! 3. record one audit line per change that went through
//! 4. re-read the lines, write the order aggregates, force `review` (fatal)
//!
//! Failures in steps 2 and 3 are collected as warnings and the remaining
//! steps still run, so a result with warnings means "some mutations
//! succeeded, verify state".

use serde::{Deserialize, Serialize};
use shared::{
    order_totals, plan_order_edit, EditedOrderItem, ItemChange, ItemChangeKind, NewOrderHistory,
    Order, OrderHistoryEntry, OrderItem, OrderItemHistoryEntry, OrderStatus,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// Edited lines as submitted from the order editor
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderEditRequest {
    #[validate]
    pub items: Vec<EditedOrderItem>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Step of the edit that failed without aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum EditStep {
    InsertItems,
    UpdateItem { item_id: Uuid },
    DeleteItems,
    RecordItemHistory,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditWarning {
    #[serde(flatten)]
    pub step: EditStep,
    pub message: String,
}

/// Everything that happened during one edit
#[derive(Debug, Clone, Serialize)]
pub struct OrderEditOutcome {
    pub order: Order,
    pub history: OrderHistoryEntry,
    pub inserted: Vec<OrderItem>,
    pub updated: Vec<Uuid>,
    pub deleted: Vec<Uuid>,
    pub unchanged: usize,
    pub orphaned: Vec<String>,
    pub item_history: Vec<OrderItemHistoryEntry>,
    pub warnings: Vec<EditWarning>,
}

impl OrderEditOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Applies order edits against the datastore
#[derive(Clone)]
pub struct OrderEditService {
    store: SharedStore,
}

impl OrderEditService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Apply `request` to `order_id` on behalf of `editor_id`
    pub async fn apply_edit(
        &self,
        order_id: Uuid,
        editor_id: &str,
        request: OrderEditRequest,
    ) -> AppResult<OrderEditOutcome> {
        request.validate()?;
        for item in &request.items {
            shared::validate_edited_item(item).map_err(|m| AppError::validation("items", m))?;
        }

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if order.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is {} and cannot be edited",
                order.order_number, order.status
            )));
        }

        let original = self.store.order_items(order_id).await?;
        let plan = plan_order_edit(order_id, &original, &request.items)?;
        for orphan in &plan.orphaned {
            tracing::warn!(order_id = %order_id, item = %orphan, "Edited item matches no line on the order; skipped");
        }

        let history = self
            .store
            .insert_history(NewOrderHistory {
                order_id,
                previous_status: order.status,
                new_status: OrderStatus::Review,
                previous_quantity: order.quantity,
                new_quantity: plan.projected_quantity,
                previous_value: order.value,
                new_value: plan.projected_value,
                notes: request.notes.clone(),
                changed_by: editor_id.to_string(),
                original_items: original,
            })
            .await
            .map_err(|e| AppError::AuditSessionFailed(e.to_string()))?;

        let mut warnings = Vec::new();

        let inserted = if plan.to_insert.is_empty() {
            Vec::new()
        } else {
            match self.store.insert_items(&plan.new_items()).await {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "Failed to insert new lines");
                    warnings.push(EditWarning {
                        step: EditStep::InsertItems,
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            }
        };

        let mut updated = Vec::with_capacity(plan.to_update.len());
        for update in &plan.to_update {
            match self.store.update_item(update).await {
                Ok(()) => updated.push(update.id),
                Err(e) => {
                    tracing::warn!(item_id = %update.id, error = %e, "Failed to update line");
                    warnings.push(EditWarning {
                        step: EditStep::UpdateItem { item_id: update.id },
                        message: e.to_string(),
                    });
                }
            }
        }

        let deleted = if plan.to_delete.is_empty() {
            Vec::new()
        } else {
            match self.store.delete_items(&plan.to_delete).await {
                Ok(_) => plan.to_delete.clone(),
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "Failed to delete removed lines");
                    warnings.push(EditWarning {
                        step: EditStep::DeleteItems,
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            }
        };

        // Only changes that reached the item table go into the audit trail.
        let mut changes: Vec<ItemChange> = plan
            .changes
            .iter()
            .filter(|c| match (c.change, c.order_item_id) {
                (ItemChangeKind::Modified, Some(id)) => updated.contains(&id),
                (ItemChangeKind::Removed, Some(id)) => deleted.contains(&id),
                _ => false,
            })
            .cloned()
            .collect();
        if !inserted.is_empty() {
            changes.extend(plan.added_changes(&inserted));
        }

        let item_history = if changes.is_empty() {
            Vec::new()
        } else {
            match self
                .store
                .insert_item_history(history.id, order_id, &changes)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(history_id = %history.id, error = %e, "Failed to record item history");
                    warnings.push(EditWarning {
                        step: EditStep::RecordItemHistory,
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            }
        };

        // Aggregates come from what is actually stored, not from the plan.
        let current = self.store.order_items(order_id).await?;
        let (quantity, value) = order_totals(&current)?;
        let order = self
            .store
            .update_order_summary(order_id, quantity, value, OrderStatus::Review)
            .await?;

        if warnings.is_empty() {
            tracing::info!(
                order_id = %order_id,
                inserted = inserted.len(),
                updated = updated.len(),
                deleted = deleted.len(),
                "Order edited and sent for review"
            );
        } else {
            tracing::warn!(
                order_id = %order_id,
                failures = warnings.len(),
                "Order edited with failures; verify its lines"
            );
        }

        Ok(OrderEditOutcome {
            order,
            history,
            inserted,
            updated,
            deleted,
            unchanged: plan.unchanged.len(),
            orphaned: plan.orphaned,
            item_history,
            warnings,
        })
    }
}
