//! PostgreSQL implementation of the datastore traits

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    AmendmentRecord, AmendmentStatus, ItemChange, ItemChangeKind, ManagerContact, ManagerRole,
    NewOrderHistory, NewOrderItem, Order, OrderHistoryEntry, OrderItem, OrderItemHistoryEntry,
    OrderItemUpdate, OrderStatus, PageRequest, StoreHierarchy, SubmissionRecord, UserProfile,
    UserRole, WeekSelection, WeeklyPlanLine,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    AmendmentRepository, HierarchyRepository, NewAmendment, NewSubmission, OrderRepository,
    PlanRepository, StoreHealth,
};
use crate::error::{AppError, AppResult};

/// Datastore backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn parse_column<T>(value: &str) -> AppResult<T>
where
    T: std::str::FromStr<Err = shared::ModelError>,
{
    value
        .parse()
        .map_err(|e: shared::ModelError| AppError::Internal(format!("Corrupt row: {}", e)))
}

// ============================================================================
// Rows
// ============================================================================

const HIERARCHY_COLUMNS: &str = "store_id, store_name, store_code, \
    store_manager_id, store_manager_name, store_manager_email, \
    area_manager_id, area_manager_name, area_manager_email, \
    regional_manager_id, regional_manager_name, regional_manager_email";

#[derive(Debug, FromRow)]
struct HierarchyRow {
    store_id: Uuid,
    store_name: String,
    store_code: Option<String>,
    store_manager_id: Option<String>,
    store_manager_name: Option<String>,
    store_manager_email: Option<String>,
    area_manager_id: Option<String>,
    area_manager_name: Option<String>,
    area_manager_email: Option<String>,
    regional_manager_id: Option<String>,
    regional_manager_name: Option<String>,
    regional_manager_email: Option<String>,
}

fn contact(id: Option<String>, name: Option<String>, email: Option<String>) -> Option<ManagerContact> {
    id.map(|id| ManagerContact { id, name, email })
}

impl From<HierarchyRow> for StoreHierarchy {
    fn from(r: HierarchyRow) -> Self {
        StoreHierarchy {
            store_id: r.store_id,
            store_name: r.store_name,
            store_code: r.store_code,
            store_manager: contact(r.store_manager_id, r.store_manager_name, r.store_manager_email),
            area_manager: contact(r.area_manager_id, r.area_manager_name, r.area_manager_email),
            regional_manager: contact(
                r.regional_manager_id,
                r.regional_manager_name,
                r.regional_manager_email,
            ),
        }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    role: String,
    store_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = AppError;

    fn try_from(r: ProfileRow) -> AppResult<Self> {
        Ok(UserProfile {
            id: r.id,
            email: r.email,
            full_name: r.full_name,
            role: parse_column::<UserRole>(&r.role)?,
            store_name: r.store_name,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct WeekRow {
    id: Uuid,
    reference: String,
    label: Option<String>,
    week_start: Option<NaiveDate>,
    week_end: Option<NaiveDate>,
    is_active: bool,
    uploaded_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WeekRow> for WeekSelection {
    fn from(r: WeekRow) -> Self {
        WeekSelection {
            id: r.id,
            reference: r.reference,
            label: r.label,
            week_start: r.week_start,
            week_end: r.week_end,
            is_active: r.is_active,
            uploaded_by: r.uploaded_by,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PlanLineRow {
    id: Uuid,
    reference: String,
    store_name: String,
    stock_code: String,
    category: Option<String>,
    description: Option<String>,
    size: Option<String>,
    qty_on_hand: i32,
    qty_in_transit: i32,
    qty_sold: i32,
    order_qty: i32,
    regional_add_qty: i32,
}

impl From<PlanLineRow> for WeeklyPlanLine {
    fn from(r: PlanLineRow) -> Self {
        WeeklyPlanLine {
            id: r.id,
            reference: r.reference,
            store_name: r.store_name,
            stock_code: r.stock_code,
            category: r.category,
            description: r.description,
            size: r.size,
            qty_on_hand: r.qty_on_hand,
            qty_in_transit: r.qty_in_transit,
            qty_sold: r.qty_sold,
            order_qty: r.order_qty,
            regional_add_qty: r.regional_add_qty,
        }
    }
}

const AMENDMENT_COLUMNS: &str = "id, reference, store_id, stock_code, amended_qty, justification, \
    status, created_by, created_by_role, admin_notes, approved_qty, created_at, updated_at";

#[derive(Debug, FromRow)]
struct AmendmentRow {
    id: Uuid,
    reference: String,
    store_id: Uuid,
    stock_code: String,
    amended_qty: i32,
    justification: String,
    status: String,
    created_by: String,
    created_by_role: String,
    admin_notes: Option<String>,
    approved_qty: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AmendmentRow> for AmendmentRecord {
    type Error = AppError;

    fn try_from(r: AmendmentRow) -> AppResult<Self> {
        Ok(AmendmentRecord {
            id: r.id,
            reference: r.reference,
            store_id: r.store_id,
            stock_code: r.stock_code,
            amended_qty: r.amended_qty,
            justification: r.justification,
            status: parse_column::<AmendmentStatus>(&r.status)?,
            created_by: r.created_by,
            created_by_role: parse_column::<ManagerRole>(&r.created_by_role)?,
            admin_notes: r.admin_notes,
            approved_qty: r.approved_qty,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubmissionRow {
    id: Uuid,
    reference: String,
    store_id: Uuid,
    status: String,
    submitted_by: String,
    submitted_by_role: String,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for SubmissionRecord {
    type Error = AppError;

    fn try_from(r: SubmissionRow) -> AppResult<Self> {
        Ok(SubmissionRecord {
            id: r.id,
            reference: r.reference,
            store_id: r.store_id,
            status: parse_column::<AmendmentStatus>(&r.status)?,
            submitted_by: r.submitted_by,
            submitted_by_role: parse_column::<ManagerRole>(&r.submitted_by_role)?,
            submitted_at: r.submitted_at,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, order_number, user_id, store_name, status, quantity, value, created_at, updated_at";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: String,
    store_name: Option<String>,
    status: String,
    quantity: i32,
    value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(r: OrderRow) -> AppResult<Self> {
        Ok(Order {
            id: r.id,
            order_number: r.order_number,
            user_id: r.user_id,
            store_name: r.store_name,
            status: parse_column::<OrderStatus>(&r.status)?,
            quantity: r.quantity,
            value: r.value,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, order_id, stock_item_id, product_name, code, price, quantity, total";

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    stock_item_id: Option<Uuid>,
    product_name: String,
    code: Option<String>,
    price: Decimal,
    quantity: i32,
    total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        OrderItem {
            id: r.id,
            order_id: r.order_id,
            stock_item_id: r.stock_item_id,
            product_name: r.product_name,
            code: r.code,
            price: r.price,
            quantity: r.quantity,
            total: r.total,
        }
    }
}

const HISTORY_COLUMNS: &str = "id, order_id, previous_status, new_status, previous_quantity, \
    new_quantity, previous_value, new_value, notes, changed_by, original_items, created_at";

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    order_id: Uuid,
    previous_status: String,
    new_status: String,
    previous_quantity: i32,
    new_quantity: i32,
    previous_value: Decimal,
    new_value: Decimal,
    notes: Option<String>,
    changed_by: String,
    original_items: Json<Vec<OrderItem>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for OrderHistoryEntry {
    type Error = AppError;

    fn try_from(r: HistoryRow) -> AppResult<Self> {
        Ok(OrderHistoryEntry {
            id: r.id,
            order_id: r.order_id,
            previous_status: parse_column::<OrderStatus>(&r.previous_status)?,
            new_status: parse_column::<OrderStatus>(&r.new_status)?,
            previous_quantity: r.previous_quantity,
            new_quantity: r.new_quantity,
            previous_value: r.previous_value,
            new_value: r.new_value,
            notes: r.notes,
            changed_by: r.changed_by,
            original_items: r.original_items.0,
            created_at: r.created_at,
        })
    }
}

const ITEM_HISTORY_COLUMNS: &str = "id, history_id, order_id, order_item_id, change_type, \
    product_name, previous_quantity, new_quantity, previous_price, new_price, created_at";

#[derive(Debug, FromRow)]
struct ItemHistoryRow {
    id: Uuid,
    history_id: Uuid,
    order_id: Uuid,
    order_item_id: Option<Uuid>,
    change_type: String,
    product_name: String,
    previous_quantity: i32,
    new_quantity: i32,
    previous_price: Decimal,
    new_price: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemHistoryRow> for OrderItemHistoryEntry {
    type Error = AppError;

    fn try_from(r: ItemHistoryRow) -> AppResult<Self> {
        Ok(OrderItemHistoryEntry {
            id: r.id,
            history_id: r.history_id,
            order_id: r.order_id,
            change: ItemChange {
                change: parse_column::<ItemChangeKind>(&r.change_type)?,
                order_item_id: r.order_item_id,
                product_name: r.product_name,
                previous_quantity: r.previous_quantity,
                new_quantity: r.new_quantity,
                previous_price: r.previous_price,
                new_price: r.new_price,
            },
            created_at: r.created_at,
        })
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

#[async_trait]
impl HierarchyRepository for PgStore {
    async fn stores_for_manager(
        &self,
        role: ManagerRole,
        user_id: &str,
    ) -> AppResult<Vec<StoreHierarchy>> {
        // Column name comes from a closed enum, never from input.
        let sql = format!(
            "SELECT {} FROM store_hierarchy WHERE {} = $1 ORDER BY store_name, store_id",
            HIERARCHY_COLUMNS,
            role.manager_column()
        );
        let rows = sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(StoreHierarchy::from).collect())
    }

    async fn find_user_profile(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, full_name, role, store_name, created_at FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }
}

// ============================================================================
// Weekly plans
// ============================================================================

#[async_trait]
impl PlanRepository for PgStore {
    async fn find_week(&self, reference: &str) -> AppResult<Option<WeekSelection>> {
        let row = sqlx::query_as::<_, WeekRow>(
            r#"
            SELECT id, reference, label, week_start, week_end, is_active, uploaded_by, created_at
            FROM week_selections
            WHERE reference = $1
            "#,
        )
        .bind(reference)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(WeekSelection::from))
    }

    async fn upsert_week(&self, week: &WeekSelection) -> AppResult<WeekSelection> {
        let row = sqlx::query_as::<_, WeekRow>(
            r#"
            INSERT INTO week_selections (id, reference, label, week_start, week_end, is_active, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (reference)
            DO UPDATE SET label = EXCLUDED.label, week_start = EXCLUDED.week_start,
                          week_end = EXCLUDED.week_end, is_active = EXCLUDED.is_active,
                          uploaded_by = EXCLUDED.uploaded_by
            RETURNING id, reference, label, week_start, week_end, is_active, uploaded_by, created_at
            "#,
        )
        .bind(week.id)
        .bind(&week.reference)
        .bind(&week.label)
        .bind(week.week_start)
        .bind(week.week_end)
        .bind(week.is_active)
        .bind(&week.uploaded_by)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn plan_lines_page(
        &self,
        reference: &str,
        store_names: &[String],
        page: PageRequest,
    ) -> AppResult<Vec<WeeklyPlanLine>> {
        let rows = sqlx::query_as::<_, PlanLineRow>(
            r#"
            SELECT id, reference, store_name, stock_code, category, description, size,
                   qty_on_hand, qty_in_transit, qty_sold, order_qty, regional_add_qty
            FROM weekly_plan
            WHERE reference = $1 AND store_name = ANY($2)
            ORDER BY store_name, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(reference)
        .bind(store_names)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(WeeklyPlanLine::from).collect())
    }

    async fn count_plan_lines(&self, reference: &str, store_names: &[String]) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM weekly_plan WHERE reference = $1 AND store_name = ANY($2)",
        )
        .bind(reference)
        .bind(store_names)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn all_plan_lines(&self, reference: &str) -> AppResult<Vec<WeeklyPlanLine>> {
        let rows = sqlx::query_as::<_, PlanLineRow>(
            r#"
            SELECT id, reference, store_name, stock_code, category, description, size,
                   qty_on_hand, qty_in_transit, qty_sold, order_qty, regional_add_qty
            FROM weekly_plan
            WHERE reference = $1
            ORDER BY store_name, id
            "#,
        )
        .bind(reference)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(WeeklyPlanLine::from).collect())
    }

    async fn delete_plan_lines(&self, reference: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM weekly_plan WHERE reference = $1")
            .bind(reference)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_plan_lines(&self, lines: &[WeeklyPlanLine]) -> AppResult<u64> {
        if lines.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO weekly_plan (id, reference, store_name, stock_code, category, \
             description, size, qty_on_hand, qty_in_transit, qty_sold, order_qty, regional_add_qty) ",
        );
        qb.push_values(lines, |mut b, line| {
            b.push_bind(line.id)
                .push_bind(&line.reference)
                .push_bind(&line.store_name)
                .push_bind(&line.stock_code)
                .push_bind(&line.category)
                .push_bind(&line.description)
                .push_bind(&line.size)
                .push_bind(line.qty_on_hand)
                .push_bind(line.qty_in_transit)
                .push_bind(line.qty_sold)
                .push_bind(line.order_qty)
                .push_bind(line.regional_add_qty);
        });

        let result = qb.build().execute(&self.db).await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Amendments
// ============================================================================

#[async_trait]
impl AmendmentRepository for PgStore {
    async fn amendments_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<AmendmentRecord>> {
        let sql = format!(
            "SELECT {} FROM weekly_plan_amendments \
             WHERE reference = $1 AND store_id = ANY($2) \
             ORDER BY created_at",
            AMENDMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AmendmentRow>(&sql)
            .bind(reference)
            .bind(store_ids)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(AmendmentRecord::try_from).collect()
    }

    async fn submissions_for_week(
        &self,
        reference: &str,
        store_ids: &[Uuid],
    ) -> AppResult<Vec<SubmissionRecord>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, reference, store_id, status, submitted_by, submitted_by_role, submitted_at
            FROM weekly_plan_submissions
            WHERE reference = $1 AND store_id = ANY($2)
            ORDER BY submitted_at
            "#,
        )
        .bind(reference)
        .bind(store_ids)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(SubmissionRecord::try_from).collect()
    }

    async fn find_amendment(&self, id: Uuid) -> AppResult<Option<AmendmentRecord>> {
        let sql = format!(
            "SELECT {} FROM weekly_plan_amendments WHERE id = $1",
            AMENDMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AmendmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(AmendmentRecord::try_from).transpose()
    }

    async fn find_amendment_for(
        &self,
        reference: &str,
        store_id: Uuid,
        stock_code: &str,
    ) -> AppResult<Option<AmendmentRecord>> {
        let sql = format!(
            "SELECT {} FROM weekly_plan_amendments \
             WHERE reference = $1 AND store_id = $2 AND stock_code = $3 \
             ORDER BY created_at DESC LIMIT 1",
            AMENDMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AmendmentRow>(&sql)
            .bind(reference)
            .bind(store_id)
            .bind(stock_code)
            .fetch_optional(&self.db)
            .await?;

        row.map(AmendmentRecord::try_from).transpose()
    }

    async fn insert_amendment(&self, amendment: NewAmendment) -> AppResult<AmendmentRecord> {
        let sql = format!(
            "INSERT INTO weekly_plan_amendments \
             (reference, store_id, stock_code, amended_qty, justification, status, created_by, created_by_role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            AMENDMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AmendmentRow>(&sql)
            .bind(&amendment.reference)
            .bind(amendment.store_id)
            .bind(&amendment.stock_code)
            .bind(amendment.amended_qty)
            .bind(&amendment.justification)
            .bind(amendment.status.as_str())
            .bind(&amendment.created_by)
            .bind(amendment.created_by_role.as_str())
            .fetch_one(&self.db)
            .await?;

        row.try_into()
    }

    async fn update_amendment(&self, amendment: &AmendmentRecord) -> AppResult<AmendmentRecord> {
        let sql = format!(
            "UPDATE weekly_plan_amendments \
             SET amended_qty = $1, justification = $2, status = $3, admin_notes = $4, \
                 approved_qty = $5, updated_at = NOW() \
             WHERE id = $6 \
             RETURNING {}",
            AMENDMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, AmendmentRow>(&sql)
            .bind(amendment.amended_qty)
            .bind(&amendment.justification)
            .bind(amendment.status.as_str())
            .bind(&amendment.admin_notes)
            .bind(amendment.approved_qty)
            .bind(amendment.id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Amendment".to_string()))?;

        row.try_into()
    }

    async fn set_amendment_status(
        &self,
        reference: &str,
        store_id: Uuid,
        from: AmendmentStatus,
        to: AmendmentStatus,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE weekly_plan_amendments
            SET status = $1, updated_at = NOW()
            WHERE reference = $2 AND store_id = $3 AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(reference)
        .bind(store_id)
        .bind(from.as_str())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_submission(&self, submission: NewSubmission) -> AppResult<SubmissionRecord> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO weekly_plan_submissions (reference, store_id, status, submitted_by, submitted_by_role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, reference, store_id, status, submitted_by, submitted_by_role, submitted_at
            "#,
        )
        .bind(&submission.reference)
        .bind(submission.store_id)
        .bind(submission.status.as_str())
        .bind(&submission.submitted_by)
        .bind(submission.submitted_by_role.as_str())
        .fetch_one(&self.db)
        .await?;

        row.try_into()
    }

    async fn delete_submissions(&self, reference: &str, store_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM weekly_plan_submissions WHERE reference = $1 AND store_id = $2",
        )
        .bind(reference)
        .bind(store_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_amendments(&self, reference: &str, store_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM weekly_plan_amendments WHERE reference = $1 AND store_id = $2",
        )
        .bind(reference)
        .bind(store_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Orders
// ============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY product_name, id",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn insert_history(&self, entry: NewOrderHistory) -> AppResult<OrderHistoryEntry> {
        let sql = format!(
            "INSERT INTO order_history (order_id, previous_status, new_status, previous_quantity, \
             new_quantity, previous_value, new_value, notes, changed_by, original_items) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {}",
            HISTORY_COLUMNS
        );
        let row = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(entry.order_id)
            .bind(entry.previous_status.as_str())
            .bind(entry.new_status.as_str())
            .bind(entry.previous_quantity)
            .bind(entry.new_quantity)
            .bind(entry.previous_value)
            .bind(entry.new_value)
            .bind(&entry.notes)
            .bind(&entry.changed_by)
            .bind(Json(&entry.original_items))
            .fetch_one(&self.db)
            .await?;

        row.try_into()
    }

    async fn insert_items(&self, items: &[NewOrderItem]) -> AppResult<Vec<OrderItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO order_items (order_id, stock_item_id, product_name, code, price, quantity, total) ",
        );
        qb.push_values(items, |mut b, item| {
            b.push_bind(item.order_id)
                .push_bind(item.stock_item_id)
                .push_bind(&item.product_name)
                .push_bind(&item.code)
                .push_bind(item.price)
                .push_bind(item.quantity)
                .push_bind(item.total);
        });
        qb.push(" RETURNING ");
        qb.push(ITEM_COLUMNS);

        let rows = qb
            .build_query_as::<OrderItemRow>()
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn restore_items(&self, items: &[OrderItem]) -> AppResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO order_items (id, order_id, stock_item_id, product_name, code, price, quantity, total) ",
        );
        qb.push_values(items, |mut b, item| {
            b.push_bind(item.id)
                .push_bind(item.order_id)
                .push_bind(item.stock_item_id)
                .push_bind(&item.product_name)
                .push_bind(&item.code)
                .push_bind(item.price)
                .push_bind(item.quantity)
                .push_bind(item.total);
        });

        let result = qb.build().execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    async fn update_item(&self, update: &OrderItemUpdate) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE order_items SET quantity = $1, price = $2, total = $3 WHERE id = $4",
        )
        .bind(update.quantity)
        .bind(update.price)
        .bind(update.total)
        .bind(update.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Order item {}", update.id)));
        }

        Ok(())
    }

    async fn delete_items(&self, item_ids: &[Uuid]) -> AppResult<u64> {
        if item_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM order_items WHERE id = ANY($1)")
            .bind(item_ids)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_item_history(
        &self,
        history_id: Uuid,
        order_id: Uuid,
        changes: &[ItemChange],
    ) -> AppResult<Vec<OrderItemHistoryEntry>> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO order_item_history (history_id, order_id, order_item_id, change_type, \
             product_name, previous_quantity, new_quantity, previous_price, new_price) ",
        );
        qb.push_values(changes, |mut b, change| {
            b.push_bind(history_id)
                .push_bind(order_id)
                .push_bind(change.order_item_id)
                .push_bind(change.change.as_str())
                .push_bind(&change.product_name)
                .push_bind(change.previous_quantity)
                .push_bind(change.new_quantity)
                .push_bind(change.previous_price)
                .push_bind(change.new_price);
        });
        qb.push(" RETURNING ");
        qb.push(ITEM_HISTORY_COLUMNS);

        let rows = qb
            .build_query_as::<ItemHistoryRow>()
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(OrderItemHistoryEntry::try_from).collect()
    }

    async fn update_order_summary(
        &self,
        order_id: Uuid,
        quantity: i32,
        value: Decimal,
        status: OrderStatus,
    ) -> AppResult<Order> {
        let sql = format!(
            "UPDATE orders SET quantity = $1, value = $2, status = $3, updated_at = NOW() \
             WHERE id = $4 RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(quantity)
            .bind(value)
            .bind(status.as_str())
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        row.try_into()
    }

    async fn order_history(&self, order_id: Uuid) -> AppResult<Vec<OrderHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM order_history WHERE order_id = $1 ORDER BY created_at DESC, id",
            HISTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&sql)
            .bind(order_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(OrderHistoryEntry::try_from).collect()
    }

    async fn item_history(&self, history_id: Uuid) -> AppResult<Vec<OrderItemHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM order_item_history WHERE history_id = $1 ORDER BY created_at, id",
            ITEM_HISTORY_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemHistoryRow>(&sql)
            .bind(history_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(OrderItemHistoryEntry::try_from).collect()
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
