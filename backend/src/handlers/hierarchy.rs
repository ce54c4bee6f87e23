//! Store hierarchy HTTP handlers

use axum::{extract::State, Json};
use shared::{StoreHierarchy, Vacancy};

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::AppState;

/// Stores the caller manages
pub async fn list_my_stores(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<StoreHierarchy>>> {
    let role = require_manager(&user)?;
    let stores = state.hierarchy().accessible_stores(role, &user.user_id).await?;
    Ok(Json(stores))
}

/// Vacant positions across the caller's stores
pub async fn list_vacancies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Vacancy>>> {
    let role = require_manager(&user)?;
    let vacancies = state.hierarchy().vacancy_report(role, &user.user_id).await?;
    Ok(Json(vacancies))
}
