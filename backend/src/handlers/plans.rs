//! Weekly plan upload handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::plan_upload::{UploadSummary, WeekUpload};
use crate::AppState;

/// Replace a week's plan with the uploaded CSV body
pub async fn upload_weekly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(reference): Path<String>,
    Query(meta): Query<WeekUpload>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<UploadSummary>)> {
    require_admin(&user)?;
    let summary = state
        .plan_uploads()
        .upload_csv(&reference, meta, &user.user_id, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
