//! Order, order item, and order history models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::ModelError;

/// Prefix marking an item added in the editor but not yet persisted
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Largest quantity accepted on a single order line
pub const MAX_ITEM_QUANTITY: i32 = 100_000;

/// Largest unit price accepted on a single order line
pub const MAX_UNIT_PRICE: i64 = 1_000_000;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Review,
    Approved,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Review => "review",
            OrderStatus::Approved => "approved",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Transitions driven by the lifecycle service.
    ///
    /// Admin edits force `review` without consulting this table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Review)
                | (Pending, Approved)
                | (Review, Completed)
                | (Review, Pending)
                | (Approved, Completed)
                | (Pending, Cancelled)
                | (Review, Cancelled)
                | (Approved, Cancelled)
                | (Completed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, ModelError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "review" => Ok(OrderStatus::Review),
            "approved" => Ok(OrderStatus::Approved),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// Order header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: String,
    pub store_name: Option<String>,
    pub status: OrderStatus,
    /// Sum of item quantities
    pub quantity: i32,
    /// Sum of item totals
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_item_id: Option<Uuid>,
    pub product_name: String,
    pub code: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

/// Price times quantity
pub fn line_total(price: Decimal, quantity: i32) -> Result<Decimal, ModelError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| ModelError::AmountOverflow(format!("{} x {}", price, quantity)))
}

/// Aggregate quantity and value over a set of items
pub fn order_totals(items: &[OrderItem]) -> Result<(i32, Decimal), ModelError> {
    items
        .iter()
        .try_fold((0, Decimal::ZERO), |(qty, value), item| {
            add_line(qty, value, item.price, item.quantity)
        })
}

/// Running totals plus one line
pub fn add_line(
    quantity: i32,
    value: Decimal,
    price: Decimal,
    line_quantity: i32,
) -> Result<(i32, Decimal), ModelError> {
    let quantity = quantity
        .checked_add(line_quantity)
        .ok_or_else(|| ModelError::AmountOverflow("total quantity".to_string()))?;
    let value = value
        .checked_add(line_total(price, line_quantity)?)
        .ok_or_else(|| ModelError::AmountOverflow("total value".to_string()))?;
    Ok((quantity, value))
}

/// Identifier carried by a line in the order editor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemRef {
    Persisted(Uuid),
    Temporary(String),
    /// Neither a temporary marker nor a valid id
    Unrecognized(String),
}

impl ItemRef {
    pub fn temporary(n: usize) -> Self {
        ItemRef::Temporary(format!("{}{}", TEMP_ID_PREFIX, n))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ItemRef::Temporary(_))
    }
}

impl From<String> for ItemRef {
    fn from(raw: String) -> Self {
        if raw.starts_with(TEMP_ID_PREFIX) {
            return ItemRef::Temporary(raw);
        }
        match Uuid::parse_str(&raw) {
            Ok(id) => ItemRef::Persisted(id),
            Err(_) => ItemRef::Unrecognized(raw),
        }
    }
}

impl From<ItemRef> for String {
    fn from(r: ItemRef) -> Self {
        match r {
            ItemRef::Persisted(id) => id.to_string(),
            ItemRef::Temporary(s) | ItemRef::Unrecognized(s) => s,
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Persisted(id) => write!(f, "{}", id),
            ItemRef::Temporary(s) | ItemRef::Unrecognized(s) => f.write_str(s),
        }
    }
}

/// A line as submitted from the order editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EditedOrderItem {
    pub id: ItemRef,
    pub stock_item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub product_name: String,
    pub code: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 1, max = 100000))]
    pub quantity: i32,
}

/// Item to insert; the temporary id has been stripped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub stock_item_id: Option<Uuid>,
    pub product_name: String,
    pub code: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

/// Changed fields of an existing item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemUpdate {
    pub id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// What happened to a line in one edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemChangeKind {
    Added,
    Modified,
    Removed,
}

impl ItemChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemChangeKind::Added => "added",
            ItemChangeKind::Modified => "modified",
            ItemChangeKind::Removed => "removed",
        }
    }
}

impl FromStr for ItemChangeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(ItemChangeKind::Added),
            "modified" => Ok(ItemChangeKind::Modified),
            "removed" => Ok(ItemChangeKind::Removed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// One per-item audit line before it is attached to a history session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChange {
    pub change: ItemChangeKind,
    pub order_item_id: Option<Uuid>,
    pub product_name: String,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub previous_price: Decimal,
    pub new_price: Decimal,
}

/// Audit session header to be written before any item mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderHistory {
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub previous_value: Decimal,
    pub new_value: Decimal,
    pub notes: Option<String>,
    pub changed_by: String,
    /// Items as they were before the session, used to restore on rejection
    pub original_items: Vec<OrderItem>,
}

/// Write-once audit session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub previous_value: Decimal,
    pub new_value: Decimal,
    pub notes: Option<String>,
    pub changed_by: String,
    pub original_items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

/// Write-once per-item audit record, grouped under a history session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemHistoryEntry {
    pub id: Uuid,
    pub history_id: Uuid,
    pub order_id: Uuid,
    #[serde(flatten)]
    pub change: ItemChange,
    pub created_at: DateTime<Utc>,
}
