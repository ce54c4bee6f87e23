//! Weekly plan models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One (week, store, stock code) inventory and order-quantity row.
///
/// Rows are written by a batch upload and only ever replaced as a whole batch.
/// The store is carried by name; resolving it to an id is the joiner's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPlanLine {
    pub id: Uuid,
    pub reference: String,
    pub store_name: String,
    pub stock_code: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub qty_on_hand: i32,
    pub qty_in_transit: i32,
    pub qty_sold: i32,
    pub order_qty: i32,
    pub regional_add_qty: i32,
}

impl WeeklyPlanLine {
    /// Quantity that will be sent: planned order plus regional top-up
    pub fn planned_qty(&self) -> i32 {
        self.order_qty + self.regional_add_qty
    }
}

/// Metadata for one uploaded week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSelection {
    pub id: Uuid,
    pub reference: String,
    pub label: Option<String>,
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    pub is_active: bool,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
