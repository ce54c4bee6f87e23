//! Storefront Order Management Platform - backend library
//!
//! Weekly plan reconciliation for store managers and the order edit engine
//! for administrators, served over HTTP by the `oms-server` binary.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{
    AmendmentService, HierarchyService, OrderEditService, OrderLifecycleService,
    PlanUploadService, ReconciliationCache, ReconciliationService,
};
use store::SharedStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub cache: ReconciliationCache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config) -> Self {
        Self {
            store,
            cache: ReconciliationCache::new(),
            config: Arc::new(config),
        }
    }

    pub fn reconciliation(&self) -> ReconciliationService {
        ReconciliationService::new(
            self.store.clone(),
            self.cache.clone(),
            self.config.reconciliation.page_size,
        )
    }

    pub fn hierarchy(&self) -> HierarchyService {
        HierarchyService::new(self.store.clone())
    }

    pub fn amendments(&self) -> AmendmentService {
        AmendmentService::new(self.store.clone())
    }

    pub fn order_edits(&self) -> OrderEditService {
        OrderEditService::new(self.store.clone())
    }

    pub fn order_lifecycle(&self) -> OrderLifecycleService {
        OrderLifecycleService::new(self.store.clone())
    }

    pub fn plan_uploads(&self) -> PlanUploadService {
        PlanUploadService::new(
            self.store.clone(),
            self.config.reconciliation.upload_chunk_size,
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Storefront Order Management Platform API v1.0"
}
