//! In-memory datastore and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use oms_backend::error::{AppError, AppResult};
use oms_backend::store::{
    AmendmentRepository, HierarchyRepository, NewAmendment, NewSubmission, OrderRepository,
    PlanRepository, SharedStore, StoreHealth,
};
use rust_decimal::Decimal;
use shared::{
    line_total, AmendmentRecord, AmendmentStatus, ItemChange, ManagerContact, ManagerRole,
    NewOrderHistory, NewOrderItem, Order, OrderHistoryEntry, OrderItem, OrderItemHistoryEntry,
    OrderItemUpdate, OrderStatus, PageRequest, StoreHierarchy, SubmissionRecord, UserProfile,
    UserRole, WeekSelection, WeeklyPlanLine,
};
use uuid::Uuid;

pub const WEEK: &str = "WK-2026-42";
pub const AREA_MANAGER: &str = "area-1";
pub const REGIONAL_MANAGER: &str = "regional-1";
pub const ADMIN: &str = "admin-1";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[derive(Default)]
pub struct MemoryState {
    pub stores: Vec<StoreHierarchy>,
    pub profiles: Vec<UserProfile>,
    pub weeks: HashMap<String, WeekSelection>,
    pub plan_lines: Vec<WeeklyPlanLine>,
    pub amendments: Vec<AmendmentRecord>,
    pub submissions: Vec<SubmissionRecord>,
    pub orders: HashMap<Uuid, Order>,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderHistoryEntry>,
    pub item_history: Vec<OrderItemHistoryEntry>,
}

/// Datastore held in memory, counting every call and failing on request
#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<MemoryState>,
    queries: AtomicUsize,
    failing: Mutex<HashSet<&'static str>>,
    failing_updates: Mutex<HashSet<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shared(self: &Arc<Self>) -> SharedStore {
        self.clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make every call to `operation` fail from now on
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Make `update_item` fail for one item only
    pub fn fail_update_of(&self, item_id: Uuid) {
        self.failing_updates.lock().unwrap().insert(item_id);
    }

    fn call(&self, operation: &'static str) -> AppResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(AppError::Internal(format!("injected failure in {}", operation)));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub fn add_store(&self, store: StoreHierarchy) {
        self.state.lock().unwrap().stores.push(store);
    }

    pub fn add_profile(&self, id: &str, role: UserRole) {
        self.state.lock().unwrap().profiles.push(UserProfile {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            full_name: None,
            role,
            store_name: None,
            created_at: Utc::now(),
        });
    }

    pub fn add_week(&self, reference: &str) {
        self.state.lock().unwrap().weeks.insert(
            reference.to_string(),
            WeekSelection {
                id: Uuid::new_v4(),
                reference: reference.to_string(),
                label: None,
                week_start: None,
                week_end: None,
                is_active: true,
                uploaded_by: Some(ADMIN.to_string()),
                created_at: Utc::now(),
            },
        );
    }

    pub fn add_plan_lines(&self, lines: Vec<WeeklyPlanLine>) {
        self.state.lock().unwrap().plan_lines.extend(lines);
    }

    pub fn add_amendment(&self, record: AmendmentRecord) {
        self.state.lock().unwrap().amendments.push(record);
    }

    pub fn add_order(&self, user_id: &str, items: &[(&str, &str, i32)]) -> (Order, Vec<OrderItem>) {
        let order_id = Uuid::new_v4();
        let items: Vec<OrderItem> = items
            .iter()
            .map(|(name, price, qty)| {
                let price = dec(price);
                OrderItem {
                    id: Uuid::new_v4(),
                    order_id,
                    stock_item_id: None,
                    product_name: name.to_string(),
                    code: None,
                    price,
                    quantity: *qty,
                    total: line_total(price, *qty).unwrap(),
                }
            })
            .collect();
        let (quantity, value) = shared::order_totals(&items).unwrap();
        let order = Order {
            id: order_id,
            order_number: format!("ORD-{}", &order_id.simple().to_string()[..6]),
            user_id: user_id.to_string(),
            store_name: None,
            status: OrderStatus::Pending,
            quantity,
            value,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut state = self.state.lock().unwrap();
        state.orders.insert(order_id, order.clone());
        state.items.extend(items.clone());
        (order, items)
    }

    pub fn order(&self, order_id: Uuid) -> Order {
        self.state.lock().unwrap().orders[&order_id].clone()
    }

    pub fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect()
    }
}

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

pub fn contact(id: &str) -> ManagerContact {
    ManagerContact {
        id: id.to_string(),
        name: Some(id.to_uppercase()),
        email: None,
    }
}

pub fn store(name: &str, area: Option<&str>, regional: Option<&str>) -> StoreHierarchy {
    StoreHierarchy {
        store_id: Uuid::new_v4(),
        store_name: name.to_string(),
        store_code: None,
        store_manager: None,
        area_manager: area.map(contact),
        regional_manager: regional.map(contact),
    }
}

pub fn plan_line(store_name: &str, stock_code: &str, order_qty: i32) -> WeeklyPlanLine {
    WeeklyPlanLine {
        id: Uuid::new_v4(),
        reference: WEEK.to_string(),
        store_name: store_name.to_string(),
        stock_code: stock_code.to_string(),
        category: None,
        description: None,
        size: None,
        qty_on_hand: 1,
        qty_in_transit: 0,
        qty_sold: 2,
        order_qty,
        regional_add_qty: 0,
    }
}

pub fn amendment(store_id: Uuid, stock_code: &str, qty: i32, age_minutes: i64) -> AmendmentRecord {
    let at = Utc::now() - Duration::minutes(age_minutes);
    AmendmentRecord {
        id: Uuid::new_v4(),
        reference: WEEK.to_string(),
        store_id,
        stock_code: stock_code.to_string(),
        amended_qty: qty,
        justification: "Local event".to_string(),
        status: AmendmentStatus::Draft,
        created_by: AREA_MANAGER.to_string(),
        created_by_role: ManagerRole::AreaManager,
        admin_notes: None,
        approved_qty: None,
        created_at: at,
        updated_at: at,
    }
}

// ----------------------------------------------------------------------
// Repository implementations
// ----------------------------------------------------------------------

#[async_trait]
impl HierarchyRepository for MemoryStore {
    async fn stores_for_manager(
        &self,
        role: ManagerRole,
        user_id: &str,
    ) -> AppResult<Vec<StoreHierarchy>> {
        self.call("stores_for_manager")?;
        let mut stores =
            shared::accessible_stores(&self.state.lock().unwrap().stores, role, user_id);
        stores.sort_by(|a, b| {
            a.store_name
                .cmp(&b.store_name)
                .then(a.store_id.cmp(&b.store_id))
        });
        Ok(stores)
    }

    async fn find_user_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        self.call("find_user_profile")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned())
    }
}

fn lines_for<'a>(
    state: &'a MemoryState,
    reference: &'a str,
    store_names: &'a [String],
) -> Vec<&'a WeeklyPlanLine> {
    let mut lines: Vec<&WeeklyPlanLine> = state
        .plan_lines
        .iter()
        .filter(|l| l.reference == reference && store_names.contains(&l.store_name))
        .collect();
    lines.sort_by(|a, b| a.store_name.cmp(&b.store_name).then(a.id.cmp(&b.id)));
    lines
}

#[async_trait]
impl PlanRepository for MemoryStore {
    async fn find_week(&self, reference: &str) -> AppResult<Option<WeekSelection>> {
        self.call("find_week")?;
        Ok(self.state.lock().unwrap().weeks.get(reference).cloned())
    }

    async fn upsert_week(&self, week: &WeekSelection) -> AppResult<WeekSelection> {
        self.call("upsert_week")?;
        self.state
            .lock()
            .unwrap()
            .weeks
            .insert(week.reference.clone(), week.clone());
        Ok(week.clone())
    }

    async fn plan_lines_page(
        &self,
        reference: &str,
        store_names: &[String],
        page: PageRequest,
    ) -> AppResult<Vec<WeeklyPlanLine>> {
        self.call("plan_lines_page")?;
        let state = self.state.lock().unwrap();
        Ok(lines_for(&state, reference, store_names)
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn count_plan_lines(&self, reference: &str, store_names: &[String]) -> AppResult<i64> {
        self.call("count_plan_lines")?;
        let state = self.state.lock().unwrap();
        Ok(lines_for(&state, reference, store_names).len() as i64)
    }

    async fn all_plan_lines(&self, reference: &str) -> AppResult<Vec<WeeklyPlanLine>> {
        self.call("all_plan_lines")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .plan_lines
            .iter()
            .filter(|l| l.reference == reference)
            .cloned()
            .collect())
    }

    async fn delete_plan_lines(&self, reference: &str) -> AppResult<u64> {
        self.call("delete_plan_lines")?;
        let mut state = self.state.lock().unwrap();
        let before = state.plan_lines.len();
        state.plan_lines.retain(|l| l.reference != reference);
        Ok((before - state.plan_lines.len()) as u64)
    }

    async fn insert_plan_lines(&self, lines: &[WeeklyPlanLine]) -> AppResult<u64> {
        self.call("insert_plan_lines")?;
        self.state
            .lock()
            .unwrap()
            .plan_lines
            .extend_from_slice(lines);
        Ok(lines.len() as u64)
    }
}

#[async_trait]
impl AmendmentRepository for MemoryStore {
    async fn amendments_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<AmendmentRecord>> {
        self.call("amendments_for_week")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .amendments
            .iter()
            .filter(|a| a.reference == reference && store_ids.contains(&a.store_id))
            .cloned()
            .collect())
    }

    async fn submissions_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<SubmissionRecord>> {
        self.call("submissions_for_week")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|s| s.reference == reference && store_ids.contains(&s.store_id))
            .cloned()
            .collect())
    }

    async fn find_amendment(&self, id: Uuid) -> AppResult<Option<AmendmentRecord>> {
        self.call("find_amendment")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .amendments
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_amendment_for(
        &self,
        reference: &str,
        store_id: Uuid,
        stock_code: &str,
    ) -> AppResult<Option<AmendmentRecord>> {
        self.call("find_amendment_for")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .amendments
            .iter()
            .filter(|a| {
                a.reference == reference && a.store_id == store_id && a.stock_code == stock_code
            })
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn insert_amendment(&self, amendment: NewAmendment) -> AppResult<AmendmentRecord> {
        self.call("insert_amendment")?;
        let now = Utc::now();
        let record = AmendmentRecord {
            id: Uuid::new_v4(),
            reference: amendment.reference,
            store_id: amendment.store_id,
            stock_code: amendment.stock_code,
            amended_qty: amendment.amended_qty,
            justification: amendment.justification,
            status: amendment.status,
            created_by: amendment.created_by,
            created_by_role: amendment.created_by_role,
            admin_notes: None,
            approved_qty: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().amendments.push(record.clone());
        Ok(record)
    }

    async fn update_amendment(&self, amendment: &AmendmentRecord) -> AppResult<AmendmentRecord> {
        self.call("update_amendment")?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .amendments
            .iter_mut()
            .find(|a| a.id == amendment.id)
            .ok_or_else(|| AppError::NotFound("Amendment".to_string()))?;
        *stored = AmendmentRecord {
            updated_at: Utc::now(),
            ..amendment.clone()
        };
        Ok(stored.clone())
    }

    async fn set_amendment_status(
        &self,
        reference: &str,
        store_id: Uuid,
        from: AmendmentStatus,
        to: AmendmentStatus,
    ) -> AppResult<u64> {
        self.call("set_amendment_status")?;
        let mut moved = 0;
        for a in self.state.lock().unwrap().amendments.iter_mut() {
            if a.reference == reference && a.store_id == store_id && a.status == from {
                a.status = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> AppResult<SubmissionRecord> {
        self.call("insert_submission")?;
        let record = SubmissionRecord {
            id: Uuid::new_v4(),
            reference: submission.reference,
            store_id: submission.store_id,
            status: submission.status,
            submitted_by: submission.submitted_by,
            submitted_by_role: submission.submitted_by_role,
            submitted_at: Utc::now(),
        };
        self.state.lock().unwrap().submissions.push(record.clone());
        Ok(record)
    }

    async fn delete_submissions(&self, reference: &str, store_id: Uuid) -> AppResult<u64> {
        self.call("delete_submissions")?;
        let mut state = self.state.lock().unwrap();
        let before = state.submissions.len();
        state
            .submissions
            .retain(|s| !(s.reference == reference && s.store_id == store_id));
        Ok((before - state.submissions.len()) as u64)
    }

    async fn delete_amendments(&self, reference: &str, store_id: Uuid) -> AppResult<u64> {
        self.call("delete_amendments")?;
        let mut state = self.state.lock().unwrap();
        let before = state.amendments.len();
        state
            .amendments
            .retain(|a| !(a.reference == reference && a.store_id == store_id));
        Ok((before - state.amendments.len()) as u64)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        self.call("find_order")?;
        Ok(self.state.lock().unwrap().orders.get(&order_id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        self.call("order_items")?;
        Ok(self.items_of(order_id))
    }

    async fn insert_history(&self, entry: NewOrderHistory) -> AppResult<OrderHistoryEntry> {
        self.call("insert_history")?;
        let record = OrderHistoryEntry {
            id: Uuid::new_v4(),
            order_id: entry.order_id,
            previous_status: entry.previous_status,
            new_status: entry.new_status,
            previous_quantity: entry.previous_quantity,
            new_quantity: entry.new_quantity,
            previous_value: entry.previous_value,
            new_value: entry.new_value,
            notes: entry.notes,
            changed_by: entry.changed_by,
            original_items: entry.original_items,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().history.push(record.clone());
        Ok(record)
    }

    async fn insert_items(&self, items: &[NewOrderItem]) -> AppResult<Vec<OrderItem>> {
        self.call("insert_items")?;
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                order_id: i.order_id,
                stock_item_id: i.stock_item_id,
                product_name: i.product_name.clone(),
                code: i.code.clone(),
                price: i.price,
                quantity: i.quantity,
                total: i.total,
            })
            .collect();
        self.state.lock().unwrap().items.extend(rows.clone());
        Ok(rows)
    }

    async fn restore_items(&self, items: &[OrderItem]) -> AppResult<u64> {
        self.call("restore_items")?;
        self.state.lock().unwrap().items.extend_from_slice(items);
        Ok(items.len() as u64)
    }

    async fn update_item(&self, update: &OrderItemUpdate) -> AppResult<()> {
        self.call("update_item")?;
        if self.failing_updates.lock().unwrap().contains(&update.id) {
            return Err(AppError::Internal(format!(
                "injected failure updating {}",
                update.id
            )));
        }
        let mut state = self.state.lock().unwrap();
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == update.id)
            .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;
        item.quantity = update.quantity;
        item.price = update.price;
        item.total = update.total;
        Ok(())
    }

    async fn delete_items(&self, item_ids: &[Uuid]) -> AppResult<u64> {
        self.call("delete_items")?;
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state.items.retain(|i| !item_ids.contains(&i.id));
        Ok((before - state.items.len()) as u64)
    }

    async fn insert_item_history(
        &self,
        history_id: Uuid,
        order_id: Uuid,
        changes: &[ItemChange],
    ) -> AppResult<Vec<OrderItemHistoryEntry>> {
        self.call("insert_item_history")?;
        let rows: Vec<OrderItemHistoryEntry> = changes
            .iter()
            .map(|c| OrderItemHistoryEntry {
                id: Uuid::new_v4(),
                history_id,
                order_id,
                change: c.clone(),
                created_at: Utc::now(),
            })
            .collect();
        self.state.lock().unwrap().item_history.extend(rows.clone());
        Ok(rows)
    }

    async fn update_order_summary(
        &self,
        order_id: Uuid,
        quantity: i32,
        value: Decimal,
        status: OrderStatus,
    ) -> AppResult<Order> {
        self.call("update_order_summary")?;
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        order.quantity = quantity;
        order.value = value;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn order_history(&self, order_id: Uuid) -> AppResult<Vec<OrderHistoryEntry>> {
        self.call("order_history")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .rev()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn item_history(&self, history_id: Uuid) -> AppResult<Vec<OrderItemHistoryEntry>> {
        self.call("item_history")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .item_history
            .iter()
            .filter(|h| h.history_id == history_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        self.call("ping")
    }
}
