//! WebAssembly module for the Storefront Order Management Platform
//!
//! Lets the order editor and the amendment grid run the same rules as the
//! server before anything is sent:
//! - Previewing an order edit
//! - Order totals
//! - Joining a week's plan lines to stores and amendments
//! - Amendment validation

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::{
    build_store_datasets, join_plan_lines, plan_order_edit, AmendmentLookup, JoinDiagnostics,
    OrderEditPlan, StoreNameIndex,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

/// Summary of an edit the editor is about to send
#[derive(Debug, Serialize)]
struct EditPreview {
    inserts: usize,
    updates: usize,
    deletes: usize,
    unchanged: usize,
    orphaned: Vec<String>,
    projected_quantity: i32,
    projected_value: Decimal,
    changes: Vec<ItemChange>,
}

impl From<OrderEditPlan> for EditPreview {
    fn from(plan: OrderEditPlan) -> Self {
        Self {
            inserts: plan.to_insert.len(),
            updates: plan.to_update.len(),
            deletes: plan.to_delete.len(),
            unchanged: plan.unchanged.len(),
            orphaned: plan.orphaned,
            projected_quantity: plan.projected_quantity,
            projected_value: plan.projected_value,
            changes: plan.changes,
        }
    }
}

/// Classify an edit without touching the server.
///
/// `original_json` is the order's stored items, `edited_json` the editor's lines.
#[wasm_bindgen]
pub fn preview_order_edit(
    order_id: &str,
    original_json: &str,
    edited_json: &str,
) -> Result<String, JsValue> {
    let order_id = order_id
        .parse::<Uuid>()
        .map_err(|e| js_error("Invalid order id", e))?;
    let original: Vec<OrderItem> =
        serde_json::from_str(original_json).map_err(|e| js_error("Invalid items JSON", e))?;
    let edited: Vec<EditedOrderItem> =
        serde_json::from_str(edited_json).map_err(|e| js_error("Invalid edited items JSON", e))?;

    let plan =
        plan_order_edit(order_id, &original, &edited).map_err(|e| js_error("Invalid edit", e))?;
    let preview = EditPreview::from(plan);
    for orphan in &preview.orphaned {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Edited item {} matches no line on the order",
            orphan
        )));
    }
    serde_json::to_string(&preview).map_err(|e| js_error("Serialization failed", e))
}

/// Quantity and value of a set of order items, as `{"quantity":..,"value":".."}`
#[wasm_bindgen]
pub fn calculate_order_totals(items_json: &str) -> Result<String, JsValue> {
    let items: Vec<OrderItem> =
        serde_json::from_str(items_json).map_err(|e| js_error("Invalid items JSON", e))?;
    let (quantity, value) = order_totals(&items).map_err(|e| js_error("Invalid totals", e))?;
    Ok(serde_json::json!({ "quantity": quantity, "value": value }).to_string())
}

/// Line total for a price string and quantity
#[wasm_bindgen]
pub fn calculate_line_total(price: &str, quantity: i32) -> Result<String, JsValue> {
    let price = price
        .parse::<Decimal>()
        .map_err(|e| js_error("Invalid price", e))?;
    line_total(price, quantity)
        .map(|total| total.to_string())
        .map_err(|e| js_error("Invalid line", e))
}

/// A week's plan joined in the browser
#[derive(Debug, Serialize)]
struct JoinedWeek {
    items: Vec<ReconciledPlanItem>,
    stores: Vec<StoreDataset>,
    diagnostics: JoinDiagnostics,
}

/// Join plan lines to the given stores and amendments.
///
/// Stores the lines name but that are missing from `stores_json` stay in
/// `items` as unresolved and are counted in `diagnostics`.
#[wasm_bindgen]
pub fn join_weekly_plan(
    stores_json: &str,
    lines_json: &str,
    amendments_json: &str,
) -> Result<String, JsValue> {
    let stores: Vec<StoreHierarchy> =
        serde_json::from_str(stores_json).map_err(|e| js_error("Invalid stores JSON", e))?;
    let lines: Vec<WeeklyPlanLine> =
        serde_json::from_str(lines_json).map_err(|e| js_error("Invalid plan lines JSON", e))?;
    let amendments: Vec<AmendmentRecord> = serde_json::from_str(amendments_json)
        .map_err(|e| js_error("Invalid amendments JSON", e))?;

    let index = StoreNameIndex::build(&stores);
    let lookup = AmendmentLookup::build(amendments);
    let (items, diagnostics) = join_plan_lines(lines, &index, &lookup);
    let joined = JoinedWeek {
        stores: build_store_datasets(&stores, &items, &[]),
        items,
        diagnostics,
    };
    serde_json::to_string(&joined).map_err(|e| js_error("Serialization failed", e))
}

/// Check an amendment before it is saved; returns the error message or an empty string
#[wasm_bindgen]
pub fn validate_amendment(amended_qty: i32, justification: &str) -> String {
    match validate_justification(amended_qty, justification) {
        Ok(()) => String::new(),
        Err(msg) => msg.to_string(),
    }
}

/// Check a stock code typed into the editor
#[wasm_bindgen]
pub fn is_valid_stock_code(code: &str) -> bool {
    validate_stock_code(code).is_ok()
}
