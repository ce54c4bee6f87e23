//! Order HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use shared::Order;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{require_admin, AuthUser, CurrentUser};
use crate::services::order_edit::{OrderEditOutcome, OrderEditRequest};
use crate::services::order_lifecycle::{HistorySession, OrderDetail};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TransitionRequest {
    pub notes: Option<String>,
}

/// The order's owner or an admin may see and decide on it
async fn ensure_owner_or_admin(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDetail> {
    let detail = state.order_lifecycle().get_order(order_id).await?;
    if user.is_admin() || detail.order.user_id == user.user_id {
        Ok(detail)
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(ensure_owner_or_admin(&state, &user, order_id).await?))
}

/// Apply an admin's line edits and send the order for review
pub async fn edit_order_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<OrderEditRequest>,
) -> AppResult<Json<OrderEditOutcome>> {
    require_admin(&user)?;
    let outcome = state
        .order_edits()
        .apply_edit(order_id, &user.user_id, request)
        .await?;
    Ok(Json(outcome))
}

pub async fn mark_order_for_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<Order>> {
    require_admin(&user)?;
    let order = state
        .order_lifecycle()
        .mark_for_review(order_id, &user.user_id, body.notes)
        .await?;
    Ok(Json(order))
}

pub async fn accept_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    ensure_owner_or_admin(&state, &user, order_id).await?;
    Ok(Json(
        state.order_lifecycle().accept(order_id, &user.user_id).await?,
    ))
}

pub async fn reject_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<Order>> {
    ensure_owner_or_admin(&state, &user, order_id).await?;
    let order = state
        .order_lifecycle()
        .reject(order_id, &user.user_id, body.notes)
        .await?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<Order>> {
    ensure_owner_or_admin(&state, &user, order_id).await?;
    let order = state
        .order_lifecycle()
        .cancel(order_id, &user.user_id, body.notes)
        .await?;
    Ok(Json(order))
}

pub async fn get_order_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Vec<HistorySession>>> {
    ensure_owner_or_admin(&state, &user, order_id).await?;
    Ok(Json(state.order_lifecycle().history(order_id).await?))
}
