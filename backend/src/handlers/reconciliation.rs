//! Weekly reconciliation HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::plan_upload::export_plan_csv;
use crate::services::ProgressReporter;
use crate::AppState;

/// Load the caller's weekly reconciliation
pub async fn get_weekly_reconciliation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(reference): Path<String>,
) -> AppResult<Response> {
    let role = require_manager(&user)?;
    let result = state
        .reconciliation()
        .load(role, &user.user_id, &reference, &mut ProgressReporter::silent())
        .await?;

    Ok(Json(&*result).into_response())
}

/// Download the caller's weekly reconciliation as CSV
pub async fn export_weekly_reconciliation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(reference): Path<String>,
) -> AppResult<Response> {
    let role = require_manager(&user)?;
    let result = state
        .reconciliation()
        .load(role, &user.user_id, &reference, &mut ProgressReporter::silent())
        .await?;
    let csv = export_plan_csv(&result)?;

    let disposition = format!("attachment; filename=\"weekly_plan_{}.csv\"", reference);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheQuery {
    pub reference: Option<String>,
}

/// Drop cached reconciliations, optionally only for one week.
///
/// Open to admins and managers only.
pub async fn clear_reconciliation_cache(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ClearCacheQuery>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.is_admin() {
        require_manager(&user)?;
    }

    let removed = match query.reference {
        Some(reference) => state.cache.invalidate_week(&reference).await,
        None => state.cache.clear().await,
    };
    tracing::info!(user_id = %user.user_id, removed, "Reconciliation cache cleared on request");

    Ok(Json(serde_json::json!({ "removed": removed })))
}
