//! Order edit classification
//!
//! Compares the items of an order as last read from the store with the items
//! submitted from the editor and decides what to insert, update, and delete.
//! Only lines whose quantity or price actually changed produce an update and
//! an audit line.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;
use crate::models::{
    add_line, line_total, EditedOrderItem, ItemChange, ItemChangeKind, ItemRef, NewOrderItem, OrderItem,
    OrderItemUpdate,
};

/// A new line, remembered with the temporary id it had in the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInsert {
    pub temp_id: String,
    pub item: NewOrderItem,
}

/// Mutations and audit lines for one edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEditPlan {
    pub to_insert: Vec<PendingInsert>,
    pub to_update: Vec<OrderItemUpdate>,
    pub to_delete: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    /// Editor ids that matched nothing and were skipped
    pub orphaned: Vec<String>,
    /// Modified lines first, then removed lines. Added lines are recorded
    /// once the store has assigned their ids, see [`OrderEditPlan::added_changes`].
    pub changes: Vec<ItemChange>,
    /// Aggregates the order will have if every mutation succeeds
    pub projected_quantity: i32,
    pub projected_value: Decimal,
}

impl OrderEditPlan {
    pub fn is_noop(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn new_items(&self) -> Vec<NewOrderItem> {
        self.to_insert.iter().map(|p| p.item.clone()).collect()
    }

    /// Audit lines for inserted items.
    ///
    /// Stored rows are matched back to pending inserts on product name and
    /// order id, each stored row used at most once. A pending insert with no
    /// stored counterpart still gets an audit line, without an item id.
    pub fn added_changes(&self, inserted: &[OrderItem]) -> Vec<ItemChange> {
        let mut used = HashSet::new();
        self.to_insert
            .iter()
            .map(|pending| {
                let stored = inserted.iter().find(|row| {
                    !used.contains(&row.id)
                        && row.order_id == pending.item.order_id
                        && row.product_name == pending.item.product_name
                });
                if let Some(row) = stored {
                    used.insert(row.id);
                }
                ItemChange {
                    change: ItemChangeKind::Added,
                    order_item_id: stored.map(|row| row.id),
                    product_name: pending.item.product_name.clone(),
                    previous_quantity: 0,
                    new_quantity: pending.item.quantity,
                    previous_price: Decimal::ZERO,
                    new_price: pending.item.price,
                }
            })
            .collect()
    }
}

/// Classify every edited and original line of `order_id`.
///
/// Fails only when a line total or the projected aggregates overflow.
pub fn plan_order_edit(
    order_id: Uuid,
    original: &[OrderItem],
    edited: &[EditedOrderItem],
) -> Result<OrderEditPlan, ModelError> {
    let originals: HashMap<Uuid, &OrderItem> = original.iter().map(|i| (i.id, i)).collect();
    let mut plan = OrderEditPlan::default();
    let mut kept: HashSet<Uuid> = HashSet::new();

    for item in edited {
        match &item.id {
            ItemRef::Temporary(temp_id) => {
                let total = line_total(item.price, item.quantity)?;
                (plan.projected_quantity, plan.projected_value) = add_line(
                    plan.projected_quantity,
                    plan.projected_value,
                    item.price,
                    item.quantity,
                )?;
                plan.to_insert.push(PendingInsert {
                    temp_id: temp_id.clone(),
                    item: NewOrderItem {
                        order_id,
                        stock_item_id: item.stock_item_id,
                        product_name: item.product_name.clone(),
                        code: item.code.clone(),
                        price: item.price,
                        quantity: item.quantity,
                        total,
                    },
                });
            }
            ItemRef::Persisted(id) => {
                let Some(before) = originals.get(id) else {
                    plan.orphaned.push(id.to_string());
                    continue;
                };
                if !kept.insert(*id) {
                    // Same line submitted twice; the first copy stands.
                    plan.orphaned.push(id.to_string());
                    continue;
                }
                (plan.projected_quantity, plan.projected_value) = add_line(
                    plan.projected_quantity,
                    plan.projected_value,
                    item.price,
                    item.quantity,
                )?;
                if before.quantity == item.quantity && before.price == item.price {
                    plan.unchanged.push(*id);
                    continue;
                }
                plan.to_update.push(OrderItemUpdate {
                    id: *id,
                    quantity: item.quantity,
                    price: item.price,
                    total: line_total(item.price, item.quantity)?,
                });
                plan.changes.push(ItemChange {
                    change: ItemChangeKind::Modified,
                    order_item_id: Some(*id),
                    product_name: before.product_name.clone(),
                    previous_quantity: before.quantity,
                    new_quantity: item.quantity,
                    previous_price: before.price,
                    new_price: item.price,
                });
            }
            ItemRef::Unrecognized(raw) => plan.orphaned.push(raw.clone()),
        }
    }

    for before in original {
        if kept.contains(&before.id) {
            continue;
        }
        plan.to_delete.push(before.id);
        plan.changes.push(ItemChange {
            change: ItemChangeKind::Removed,
            order_item_id: Some(before.id),
            product_name: before.product_name.clone(),
            previous_quantity: before.quantity,
            new_quantity: 0,
            previous_price: before.price,
            new_price: Decimal::ZERO,
        });
    }

    Ok(plan)
}
