//! Weekly plan batch upload and export
//!
//! A batch is always replaced whole: the old rows for the reference are
//! deleted and the new rows inserted in chunks.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{ReconciledPlanItem, WeekSelection, WeeklyPlanLine, WeeklyReconciliation};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// One row of an uploaded plan spreadsheet
#[derive(Debug, Clone, Deserialize)]
pub struct PlanCsvRow {
    pub store_name: String,
    pub stock_code: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub qty_on_hand: i32,
    #[serde(default)]
    pub qty_in_transit: i32,
    #[serde(default)]
    pub qty_sold: i32,
    pub order_qty: i32,
    #[serde(default)]
    pub regional_add_qty: i32,
}

impl PlanCsvRow {
    fn into_line(self, reference: &str) -> WeeklyPlanLine {
        WeeklyPlanLine {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            store_name: self.store_name.trim().to_string(),
            stock_code: self.stock_code.trim().to_string(),
            category: non_empty(self.category),
            description: non_empty(self.description),
            size: non_empty(self.size),
            qty_on_hand: self.qty_on_hand,
            qty_in_transit: self.qty_in_transit,
            qty_sold: self.qty_sold,
            order_qty: self.order_qty,
            regional_add_qty: self.regional_add_qty,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Week metadata sent with an upload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeekUpload {
    pub label: Option<String>,
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub week: WeekSelection,
    pub replaced: u64,
    pub inserted: u64,
}

/// One exported row: the plan line with its store and amendment outcome
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    store_name: &'a str,
    store_id: Option<Uuid>,
    stock_code: &'a str,
    category: Option<&'a str>,
    description: Option<&'a str>,
    size: Option<&'a str>,
    qty_on_hand: i32,
    qty_in_transit: i32,
    qty_sold: i32,
    order_qty: i32,
    regional_add_qty: i32,
    planned_qty: i32,
    amended_qty: Option<i32>,
    amendment_status: Option<&'static str>,
    justification: Option<&'a str>,
    final_qty: i32,
}

impl<'a> From<&'a ReconciledPlanItem> for ExportRow<'a> {
    fn from(item: &'a ReconciledPlanItem) -> Self {
        let line = &item.line;
        let amendment = item.amendment.as_ref();
        Self {
            store_name: &line.store_name,
            store_id: item.store_id(),
            stock_code: &line.stock_code,
            category: line.category.as_deref(),
            description: line.description.as_deref(),
            size: line.size.as_deref(),
            qty_on_hand: line.qty_on_hand,
            qty_in_transit: line.qty_in_transit,
            qty_sold: line.qty_sold,
            order_qty: line.order_qty,
            regional_add_qty: line.regional_add_qty,
            planned_qty: line.planned_qty(),
            amended_qty: amendment.map(|a| a.effective_qty()),
            amendment_status: amendment.map(|a| a.status.as_str()),
            justification: amendment.map(|a| a.justification.as_str()),
            final_qty: item.effective_qty(),
        }
    }
}

/// Parse a plan spreadsheet into lines for `reference`.
///
/// Row numbers in errors count the header as row 1.
pub fn parse_plan_csv(reference: &str, data: &[u8]) -> AppResult<Vec<WeeklyPlanLine>> {
    shared::validate_week_reference(reference)
        .map_err(|m| AppError::validation("reference", m))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(data);

    let mut lines = Vec::new();
    for (idx, row) in reader.deserialize::<PlanCsvRow>().enumerate() {
        let row_number = idx + 2;
        let row = row.map_err(|e| AppError::Spreadsheet(format!("Row {}: {}", row_number, e)))?;
        let line = row.into_line(reference);
        shared::validate_plan_line(&line)
            .map_err(|m| AppError::Spreadsheet(format!("Row {}: {}", row_number, m)))?;
        lines.push(line);
    }

    if lines.is_empty() {
        return Err(AppError::Spreadsheet(
            "The spreadsheet has no plan rows".to_string(),
        ));
    }

    Ok(lines)
}

/// Serialize a reconciliation's items to CSV
pub fn export_plan_csv(reconciliation: &WeeklyReconciliation) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for item in &reconciliation.items {
        wtr.serialize(ExportRow::from(item))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

#[derive(Clone)]
pub struct PlanUploadService {
    store: SharedStore,
    chunk_size: usize,
}

impl PlanUploadService {
    pub fn new(store: SharedStore, chunk_size: usize) -> Self {
        Self { store, chunk_size }
    }

    /// Parse `data` and replace the batch for `reference` with it
    pub async fn upload_csv(
        &self,
        reference: &str,
        meta: WeekUpload,
        uploaded_by: &str,
        data: &[u8],
    ) -> AppResult<UploadSummary> {
        let lines = parse_plan_csv(reference, data)?;
        self.replace_week(reference, meta, uploaded_by, &lines).await
    }

    /// Delete the batch for `reference` and insert `lines` in its place.
    ///
    /// The old batch is read first so it can be put back if the insert
    /// fails. A failed backup read is only logged.
    pub async fn replace_week(
        &self,
        reference: &str,
        meta: WeekUpload,
        uploaded_by: &str,
        lines: &[WeeklyPlanLine],
    ) -> AppResult<UploadSummary> {
        if self.chunk_size == 0 {
            return Err(AppError::Configuration(
                "upload_chunk_size must be greater than zero".to_string(),
            ));
        }

        let backup = match self.store.all_plan_lines(reference).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(reference, error = %e, "Could not back up existing plan lines");
                Vec::new()
            }
        };

        let replaced = self.store.delete_plan_lines(reference).await?;
        tracing::info!(reference, replaced, "Existing plan lines removed");

        let inserted = match self.insert_chunked(lines).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(reference, error = %e, "Plan upload failed; restoring previous batch");
                if !backup.is_empty() {
                    if let Err(restore) = self.insert_chunked(&backup).await {
                        tracing::error!(reference, error = %restore, "Could not restore previous batch");
                    }
                }
                return Err(e);
            }
        };

        let existing = self.store.find_week(reference).await?;
        let week = self
            .store
            .upsert_week(&merge_week(existing, reference, meta, uploaded_by))
            .await?;

        tracing::info!(reference, inserted, "Weekly plan uploaded");

        Ok(UploadSummary {
            week,
            replaced,
            inserted,
        })
    }

    async fn insert_chunked(&self, lines: &[WeeklyPlanLine]) -> AppResult<u64> {
        let mut inserted = 0;
        for chunk in lines.chunks(self.chunk_size) {
            inserted += self.store.insert_plan_lines(chunk).await?;
        }
        Ok(inserted)
    }
}

fn merge_week(
    existing: Option<WeekSelection>,
    reference: &str,
    meta: WeekUpload,
    uploaded_by: &str,
) -> WeekSelection {
    match existing {
        Some(mut week) => {
            week.label = meta.label.or(week.label);
            week.week_start = meta.week_start.or(week.week_start);
            week.week_end = meta.week_end.or(week.week_end);
            week.uploaded_by = Some(uploaded_by.to_string());
            week
        }
        None => WeekSelection {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            label: meta.label,
            week_start: meta.week_start,
            week_end: meta.week_end,
            is_active: true,
            uploaded_by: Some(uploaded_by.to_string()),
            created_at: Utc::now(),
        },
    }
}
