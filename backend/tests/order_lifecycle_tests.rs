//! Order lifecycle tests
//!
//! Tests for order status transitions:
//! - Review, accept, reject, cancel
//! - Rejection restores the lines captured before review
//! - Illegal transitions are refused without side effects

mod common;

use common::*;
use oms_backend::error::AppError;
use oms_backend::services::order_edit::OrderEditRequest;
use oms_backend::services::{OrderEditService, OrderLifecycleService};
use shared::{EditedOrderItem, ItemRef, OrderStatus};

#[tokio::test]
async fn test_mark_for_review_then_accept() {
    let mem = MemoryStore::new();
    let (order, _) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
    let svc = OrderLifecycleService::new(mem.shared());

    let reviewed = svc.mark_for_review(order.id, ADMIN, None).await.unwrap();
    assert_eq!(reviewed.status, OrderStatus::Review);

    let accepted = svc.accept(order.id, "cust-1").await.unwrap();
    assert_eq!(accepted.status, OrderStatus::Completed);

    let history = svc.history(order.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].entry.new_status, OrderStatus::Completed);
    assert_eq!(history[1].entry.new_status, OrderStatus::Review);
}

#[tokio::test]
async fn test_accept_requires_review() {
    let mem = MemoryStore::new();
    let (order, _) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
    let svc = OrderLifecycleService::new(mem.shared());

    let err = svc.accept(order.id, "cust-1").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
    assert_eq!(mem.order(order.id).status, OrderStatus::Pending);
    assert!(svc.history(order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_restores_lines_from_before_the_edit() {
    let mem = MemoryStore::new();
    let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);

    OrderEditService::new(mem.shared())
        .apply_edit(
            order.id,
            ADMIN,
            OrderEditRequest {
                items: vec![EditedOrderItem {
                    id: ItemRef::Persisted(original[0].id),
                    stock_item_id: None,
                    product_name: "Bed".to_string(),
                    code: None,
                    price: dec("100"),
                    quantity: 5,
                }],
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(mem.order(order.id).value, dec("500"));

    let svc = OrderLifecycleService::new(mem.shared());
    let restored = svc
        .reject(order.id, "cust-1", Some("Too many beds".to_string()))
        .await
        .unwrap();

    assert_eq!(restored.status, OrderStatus::Pending);
    assert_eq!(restored.value, dec("250"));
    assert_eq!(restored.quantity, 3);

    let mut items = mem.items_of(order.id);
    items.sort_by_key(|i| i.product_name.clone());
    let mut expected = original.clone();
    expected.sort_by_key(|i| i.product_name.clone());
    assert_eq!(items, expected);
}

fn bed(item: &shared::OrderItem, quantity: i32) -> OrderEditRequest {
    OrderEditRequest {
        items: vec![EditedOrderItem {
            id: ItemRef::Persisted(item.id),
            stock_item_id: None,
            product_name: "Bed".to_string(),
            code: None,
            price: dec("100"),
            quantity,
        }],
        notes: None,
    }
}

#[tokio::test]
async fn test_reject_after_two_edits_restores_the_first_edit() {
    let mem = MemoryStore::new();
    let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);
    let edits = OrderEditService::new(mem.shared());

    edits.apply_edit(order.id, ADMIN, bed(&original[0], 5)).await.unwrap();
    let after_first = mem.items_of(order.id);
    edits.apply_edit(order.id, ADMIN, bed(&original[0], 7)).await.unwrap();
    assert_eq!(mem.order(order.id).value, dec("700"));

    let restored = OrderLifecycleService::new(mem.shared())
        .reject(order.id, "cust-1", None)
        .await
        .unwrap();

    assert_eq!(restored.status, OrderStatus::Pending);
    assert_eq!(restored.value, dec("500"));
    assert_eq!(restored.quantity, 5);
    assert_eq!(mem.items_of(order.id), after_first);
}

#[tokio::test]
async fn test_reject_without_snapshot_is_not_found() {
    let mem = MemoryStore::new();
    let (order, _) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
    mem.state
        .lock()
        .unwrap()
        .orders
        .get_mut(&order.id)
        .unwrap()
        .status = OrderStatus::Review;

    let err = OrderLifecycleService::new(mem.shared())
        .reject(order.id, "cust-1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let mem = MemoryStore::new();
    let (order, _) = mem.add_order("cust-1", &[("Bed", "100", 2)]);
    let svc = OrderLifecycleService::new(mem.shared());

    let cancelled = svc.cancel(order.id, "cust-1", None).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    assert!(svc.cancel(order.id, "cust-1", None).await.is_err());
    assert!(svc.mark_for_review(order.id, ADMIN, None).await.is_err());
}

#[tokio::test]
async fn test_get_order_returns_lines() {
    let mem = MemoryStore::new();
    let (order, original) = mem.add_order("cust-1", &[("Bed", "100", 2), ("Pillow", "50", 1)]);

    let detail = OrderLifecycleService::new(mem.shared())
        .get_order(order.id)
        .await
        .unwrap();
    assert_eq!(detail.order, order);
    assert_eq!(detail.items, original);
}
