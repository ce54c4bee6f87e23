//! Route definitions for the Storefront Order Management Platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything except health requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/reconciliation", reconciliation_routes())
        .nest("/plans", plan_routes())
        .nest("/amendments", amendment_routes())
        .nest("/orders", order_routes())
        .nest("/hierarchy", hierarchy_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Weekly reconciliation routes
fn reconciliation_routes() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(handlers::clear_reconciliation_cache))
        .route("/:reference", get(handlers::get_weekly_reconciliation))
        .route("/:reference/export", get(handlers::export_weekly_reconciliation))
}

/// Weekly plan batch routes (admin)
fn plan_routes() -> Router<AppState> {
    Router::new().route("/:reference/upload", post(handlers::upload_weekly_plan))
}

/// Amendment workflow routes
fn amendment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::save_amendment))
        .route(
            "/weeks/:reference/stores/:store_id/submit",
            post(handlers::submit_store_amendments),
        )
        .route(
            "/weeks/:reference/stores/:store_id",
            delete(handlers::reset_store_submissions),
        )
        .route("/:id/approve", post(handlers::approve_amendment))
        .route("/:id/reset", post(handlers::reset_amendment))
}

/// Order edit and lifecycle routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/items", put(handlers::edit_order_items))
        .route("/:order_id/review", post(handlers::mark_order_for_review))
        .route("/:order_id/accept", post(handlers::accept_order))
        .route("/:order_id/reject", post(handlers::reject_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
        .route("/:order_id/history", get(handlers::get_order_history))
}

/// Store hierarchy routes
fn hierarchy_routes() -> Router<AppState> {
    Router::new()
        .route("/stores", get(handlers::list_my_stores))
        .route("/vacancies", get(handlers::list_vacancies))
}
