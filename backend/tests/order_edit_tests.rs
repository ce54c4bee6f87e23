//! Order edit engine tests
//!
//! Tests for applying admin edits to an order's lines:
//! - Modify / remove / add in one edit
//! - Audit trail only records mutations that went through
//! - A failed audit session aborts before any item is touched
//! - Every original line ends up updated, deleted, or unchanged

mod common;

use std::sync::Arc;

use common::*;
use oms_backend::error::AppError;
use oms_backend::services::order_edit::{EditStep, OrderEditRequest};
use oms_backend::services::OrderEditService;
use proptest::prelude::*;
use shared::{EditedOrderItem, ItemChangeKind, ItemRef, OrderItem, OrderStatus};

fn keep(item: &OrderItem, quantity: i32) -> EditedOrderItem {
    EditedOrderItem {
        id: ItemRef::Persisted(item.id),
        stock_item_id: item.stock_item_id,
        product_name: item.product_name.clone(),
        code: item.code.clone(),
        price: item.price,
        quantity,
    }
}

fn new_line(n: usize, name: &str, price: &str, quantity: i32) -> EditedOrderItem {
    EditedOrderItem {
        id: ItemRef::temporary(n),
        stock_item_id: None,
        product_name: name.to_string(),
        code: None,
        price: dec(price),
        quantity,
    }
}

fn request(items: Vec<EditedOrderItem>) -> OrderEditRequest {
    OrderEditRequest {
        items,
        notes: Some("Adjusted after stock check".to_string()),
    }
}

fn service(mem: &Arc<MemoryStore>) -> OrderEditService {
    OrderEditService::new(mem.shared())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_modify_remove_add() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);
        let a = &original[0];
        let b = &original[1];

        let outcome = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(a, 3), new_line(1, "New", "75", 1)]),
            )
            .await
            .unwrap();

        assert!(!outcome.is_partial());
        assert_eq!(outcome.updated, vec![a.id]);
        assert_eq!(outcome.deleted, vec![b.id]);
        assert_eq!(outcome.inserted.len(), 1);
        assert_eq!(outcome.inserted[0].product_name, "New");

        assert_eq!(outcome.order.value, dec("375"));
        assert_eq!(outcome.order.quantity, 4);
        assert_eq!(outcome.order.status, OrderStatus::Review);

        let kinds: Vec<ItemChangeKind> = outcome.item_history.iter().map(|h| h.change.change).collect();
        assert_eq!(
            kinds,
            vec![ItemChangeKind::Modified, ItemChangeKind::Removed, ItemChangeKind::Added]
        );
        assert!(outcome
            .item_history
            .iter()
            .all(|h| h.history_id == outcome.history.id));

        let stored = mem.items_of(order.id);
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|i| i.id != b.id));
    }

    #[tokio::test]
    async fn test_history_snapshot_holds_original_lines() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);

        let outcome = service(&mem)
            .apply_edit(order.id, ADMIN, request(vec![keep(&original[0], 1)]))
            .await
            .unwrap();

        assert_eq!(outcome.history.original_items, original);
        assert_eq!(outcome.history.previous_status, OrderStatus::Pending);
        assert_eq!(outcome.history.new_status, OrderStatus::Review);
        assert_eq!(outcome.history.previous_value, dec("250"));
        assert_eq!(outcome.history.new_value, dec("100"));
        assert_eq!(outcome.history.changed_by, ADMIN);
    }

    #[tokio::test]
    async fn test_unchanged_edit_writes_no_item_changes() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);

        let outcome = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(original.iter().map(|i| keep(i, i.quantity)).collect()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, 2);
        assert!(outcome.updated.is_empty());
        assert!(outcome.deleted.is_empty());
        assert!(outcome.item_history.is_empty());
        assert_eq!(outcome.order.value, dec("250"));
        assert_eq!(outcome.order.status, OrderStatus::Review);
    }

    #[tokio::test]
    async fn test_failed_update_is_a_warning_and_not_audited() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);
        let a = &original[0];
        mem.fail_update_of(a.id);

        let outcome = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(a, 3), new_line(1, "New", "75", 1)]),
            )
            .await
            .unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].step, EditStep::UpdateItem { item_id: a.id });
        assert!(outcome.updated.is_empty());

        let kinds: Vec<ItemChangeKind> = outcome.item_history.iter().map(|h| h.change.change).collect();
        assert_eq!(kinds, vec![ItemChangeKind::Removed, ItemChangeKind::Added]);

        // Aggregates follow what is stored: A still 2 x 100
        assert_eq!(outcome.order.value, dec("275"));
        assert_eq!(outcome.order.quantity, 3);
    }

    #[tokio::test]
    async fn test_failed_insert_is_a_warning() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
        mem.fail_on("insert_items");

        let outcome = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(&original[0], 2), new_line(1, "New", "75", 1)]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].step, EditStep::InsertItems);
        assert!(outcome.inserted.is_empty());
        assert!(outcome.item_history.is_empty());
        assert_eq!(outcome.order.value, dec("200"));
    }

    #[tokio::test]
    async fn test_failed_item_history_is_a_warning() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
        mem.fail_on("insert_item_history");

        let outcome = service(&mem)
            .apply_edit(order.id, ADMIN, request(vec![keep(&original[0], 5)]))
            .await
            .unwrap();

        assert_eq!(outcome.warnings[0].step, EditStep::RecordItemHistory);
        assert_eq!(outcome.updated, vec![original[0].id]);
        assert_eq!(outcome.order.value, dec("500"));
    }

    #[tokio::test]
    async fn test_failed_audit_session_aborts_everything() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);
        mem.fail_on("insert_history");

        let err = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(&original[0], 9), new_line(1, "New", "75", 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AuditSessionFailed(_)));
        assert_eq!(mem.items_of(order.id), original);
        assert_eq!(mem.order(order.id).status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_failed_summary_update_is_fatal() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
        mem.fail_on("update_order_summary");

        let result = service(&mem)
            .apply_edit(order.id, ADMIN, request(vec![keep(&original[0], 3)]))
            .await;

        assert!(result.is_err());
        // The item table is ahead of the order header
        assert_eq!(mem.items_of(order.id)[0].quantity, 3);
        assert_eq!(mem.order(order.id).quantity, 2);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_orphaned() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
        let stranger = uuid::Uuid::new_v4();
        let mut ghost = keep(&original[0], 4);
        ghost.id = ItemRef::Persisted(stranger);

        let outcome = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(&original[0], 2), ghost]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.orphaned, vec![stranger.to_string()]);
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.order.value, dec("200"));
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_edited() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
        mem.state
            .lock()
            .unwrap()
            .orders
            .get_mut(&order.id)
            .unwrap()
            .status = OrderStatus::Cancelled;

        let err = service(&mem)
            .apply_edit(order.id, ADMIN, request(vec![keep(&original[0], 3)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn test_zero_quantity_is_rejected() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);

        let err = service(&mem)
            .apply_edit(order.id, ADMIN, request(vec![keep(&original[0], 0)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(mem.queries(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_lines_are_rejected_before_any_write() {
        let mem = MemoryStore::new();
        let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2)]);

        let huge_quantity = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![keep(&original[0], i32::MAX), new_line(1, "Pillow", "50", 10)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(huge_quantity, AppError::Validation { .. }));

        let huge_price = service(&mem)
            .apply_edit(
                order.id,
                ADMIN,
                request(vec![new_line(1, "Gold bed", "79228162514264337593543950.33", 1_000)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(huge_price, AppError::Validation { .. }));

        assert_eq!(mem.queries(), 0);
        assert_eq!(mem.order(order.id).quantity, 2);
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let mem = MemoryStore::new();
        let err = service(&mem)
            .apply_edit(uuid::Uuid::new_v4(), ADMIN, request(vec![]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Every original line is updated, deleted, or left unchanged, exactly
    /// once, and the stored aggregate matches the kept lines plus new ones
    #[test]
    fn prop_every_original_line_is_accounted_for(
        edits in prop::collection::vec((any::<bool>(), 1i32..6), 1..8),
        additions in 0usize..3,
    ) {
        let mem = MemoryStore::new();
        let layout: Vec<(String, String, i32)> = edits
            .iter()
            .enumerate()
            .map(|(n, _)| (format!("Item {}", n), "10".to_string(), 2))
            .collect();
        let borrowed: Vec<(&str, &str, i32)> = layout
            .iter()
            .map(|(name, price, qty)| (name.as_str(), price.as_str(), *qty))
            .collect();
        let (order, original) = mem.add_order("cust-1", &borrowed);

        let mut items: Vec<EditedOrderItem> = original
            .iter()
            .zip(&edits)
            .filter(|(_, (kept, _))| *kept)
            .map(|(item, (_, qty))| keep(item, *qty))
            .collect();
        for n in 0..additions {
            items.push(new_line(n, &format!("Added {}", n), "10", 1));
        }
        let expected_quantity: i32 = items.iter().map(|i| i.quantity).sum();

        let outcome = tokio_test::block_on(service(&mem).apply_edit(order.id, ADMIN, request(items))).unwrap();

        prop_assert_eq!(
            outcome.updated.len() + outcome.deleted.len() + outcome.unchanged,
            original.len()
        );
        prop_assert_eq!(outcome.inserted.len(), additions);
        prop_assert_eq!(outcome.order.quantity, expected_quantity);
        prop_assert_eq!(outcome.order.value, dec("10") * rust_decimal::Decimal::from(expected_quantity));
        prop_assert_eq!(outcome.item_history.len(), outcome.updated.len() + outcome.deleted.len() + additions);
        prop_assert!(outcome.warnings.is_empty());
    }
}
