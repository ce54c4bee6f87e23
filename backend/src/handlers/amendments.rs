//! Amendment workflow HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::AmendmentRecord;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_admin, require_manager, CurrentUser};
use crate::services::amendment::{AmendmentInput, ApprovalInput, SubmissionOutcome};
use crate::AppState;

/// Save a draft amendment
pub async fn save_amendment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AmendmentInput>,
) -> AppResult<Json<AmendmentRecord>> {
    let role = require_manager(&user)?;
    let record = state
        .amendments()
        .upsert_draft(role, &user.user_id, input)
        .await?;
    Ok(Json(record))
}

/// Send a store's drafts up the hierarchy
pub async fn submit_store_amendments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((reference, store_id)): Path<(String, Uuid)>,
) -> AppResult<Json<SubmissionOutcome>> {
    let role = require_manager(&user)?;
    let outcome = state
        .amendments()
        .submit_store(role, &user.user_id, &reference, store_id)
        .await?;
    Ok(Json(outcome))
}

pub async fn approve_amendment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ApprovalInput>,
) -> AppResult<Json<AmendmentRecord>> {
    require_admin(&user)?;
    Ok(Json(state.amendments().approve(id, input).await?))
}

pub async fn reset_amendment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AmendmentRecord>> {
    require_admin(&user)?;
    Ok(Json(state.amendments().reset_to_draft(id).await?))
}

/// Remove a store's submissions and amendments for a week
pub async fn reset_store_submissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((reference, store_id)): Path<(String, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    require_admin(&user)?;
    let (submissions_deleted, amendments_deleted) = state
        .amendments()
        .reset_submissions(&reference, store_id)
        .await?;
    Ok(Json(serde_json::json!({
        "submissions_deleted": submissions_deleted,
        "amendments_deleted": amendments_deleted,
    })))
}
