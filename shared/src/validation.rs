//! Validation utilities for the Storefront Order Management Platform

use rust_decimal::Decimal;

use crate::models::{EditedOrderItem, WeeklyPlanLine, MAX_ITEM_QUANTITY, MAX_UNIT_PRICE};

// ============================================================================
// Weekly Plan Validations
// ============================================================================

/// Validate a week reference (e.g. "WK-2026-42")
pub fn validate_week_reference(reference: &str) -> Result<(), &'static str> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err("Week reference is required");
    }
    if trimmed.len() > 64 {
        return Err("Week reference must be at most 64 characters");
    }
    if trimmed != reference {
        return Err("Week reference must not have leading or trailing spaces");
    }
    Ok(())
}

/// Validate stock code format (alphanumeric with '-', '_' or '/')
pub fn validate_stock_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Stock code is required");
    }
    if code.len() > 40 {
        return Err("Stock code must be at most 40 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
    {
        return Err("Stock code may only contain letters, digits, '-', '_' and '/'");
    }
    Ok(())
}

/// Validate a stock quantity (zero allowed)
pub fn validate_quantity(qty: i32) -> Result<(), &'static str> {
    if qty < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Validate one uploaded plan line
pub fn validate_plan_line(line: &WeeklyPlanLine) -> Result<(), &'static str> {
    validate_week_reference(&line.reference)?;
    validate_stock_code(&line.stock_code)?;
    if line.store_name.trim().is_empty() {
        return Err("Store name is required");
    }
    for qty in [
        line.qty_on_hand,
        line.qty_in_transit,
        line.qty_sold,
        line.order_qty,
    ] {
        validate_quantity(qty)?;
    }
    // Regional add may be negative to pull stock back.
    Ok(())
}

/// Every amendment says why the planned quantity is being overridden
pub fn validate_justification(amended_qty: i32, justification: &str) -> Result<(), &'static str> {
    validate_quantity(amended_qty)?;
    if justification.trim().is_empty() {
        return Err("A justification is required");
    }
    if justification.chars().count() > 1000 {
        return Err("Justification must be at most 1000 characters");
    }
    Ok(())
}

// ============================================================================
// Order Validations
// ============================================================================

/// Validate a unit price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price > Decimal::from(MAX_UNIT_PRICE) {
        return Err("Price is above the largest accepted unit price");
    }
    if price.scale() > 2 {
        return Err("Price must have at most two decimal places");
    }
    Ok(())
}

/// Checks on an edited line that the derive cannot express
pub fn validate_edited_item(item: &EditedOrderItem) -> Result<(), &'static str> {
    validate_price(item.price)?;
    if !(1..=MAX_ITEM_QUANTITY).contains(&item.quantity) {
        return Err("Quantity must be between 1 and 100000");
    }
    if let Some(code) = &item.code {
        validate_stock_code(code)?;
    }
    Ok(())
}
