//! Weekly plan reconciliation
//!
//! Loads everything a manager needs to review one week: their stores, the
//! week's plan lines for those stores, and any amendments, joined into one
//! result. Results are cached per (role, user, week) and progress is
//! published on a watch channel while the load runs.

use std::sync::Arc;

use shared::{
    accessible_store_ids, accessible_store_names, build_store_datasets, join_plan_lines,
    AmendmentLookup, ManagerRole, ReconciliationProgress, StoreNameIndex, WeeklyReconciliation,
};
use tokio::sync::watch;

use super::bulk_fetch::fetch_all_pages;
use super::cache::{CacheKey, ReconciliationCache};
use super::hierarchy::HierarchyService;
use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// Publishes progress updates; every update moves forward
pub struct ProgressReporter {
    tx: Option<watch::Sender<ReconciliationProgress>>,
    state: ReconciliationProgress,
}

impl ProgressReporter {
    /// Reporter that only tracks state
    pub fn silent() -> Self {
        Self {
            tx: None,
            state: ReconciliationProgress::start(),
        }
    }

    /// Reporter plus a receiver the caller can poll or await
    pub fn channel() -> (Self, watch::Receiver<ReconciliationProgress>) {
        let (tx, rx) = watch::channel(ReconciliationProgress::start());
        (
            Self {
                tx: Some(tx),
                state: ReconciliationProgress::start(),
            },
            rx,
        )
    }

    pub fn snapshot(&self) -> ReconciliationProgress {
        self.state.clone()
    }

    fn step(&mut self, completed: u32, operation: &str) {
        self.state.completed = self.state.completed.max(completed);
        self.state.current_operation = operation.to_string();
        self.publish();
    }

    fn records(&mut self, loaded: usize) {
        self.state.actual_records_loaded = self.state.actual_records_loaded.max(loaded);
        self.state.estimated_total = self.state.estimated_total.max(loaded);
        self.publish();
    }

    fn estimate(&mut self, total: usize) {
        self.state.estimated_total = total;
        self.publish();
    }

    fn finish(&mut self, operation: &str) {
        self.state.completed = self.state.total;
        self.state.current_operation = operation.to_string();
        self.publish();
    }

    fn publish(&self) {
        if let Some(tx) = &self.tx {
            tx.send_replace(self.state.clone());
        }
    }
}

/// Orchestrates a weekly reconciliation load
#[derive(Clone)]
pub struct ReconciliationService {
    store: SharedStore,
    cache: ReconciliationCache,
    page_size: usize,
}

impl ReconciliationService {
    pub fn new(store: SharedStore, cache: ReconciliationCache, page_size: usize) -> Self {
        Self {
            store,
            cache,
            page_size,
        }
    }

    pub fn cache(&self) -> &ReconciliationCache {
        &self.cache
    }

    /// Load the week for a manager, serving from cache when possible
    pub async fn load(
        &self,
        role: ManagerRole,
        user_id: &str,
        reference: &str,
        progress: &mut ProgressReporter,
    ) -> AppResult<Arc<WeeklyReconciliation>> {
        if role == ManagerRole::StoreManager {
            return Err(AppError::InsufficientPermissions);
        }

        let key = CacheKey::new(role, user_id, reference);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Reconciliation cache hit");
            progress.records(hit.items.len());
            progress.finish("Loaded from cache");
            return Ok(hit);
        }

        tracing::info!(key = %key, "Loading weekly reconciliation");

        // 1. Stores this manager may see
        progress.step(0, "Resolving accessible stores");
        let stores = HierarchyService::new(self.store.clone())
            .accessible_stores(role, user_id)
            .await?;
        progress.step(1, "Resolving accessible stores");

        // 2. Plan lines carry store names, amendments carry store ids
        let store_names = accessible_store_names(&stores);
        let store_ids = accessible_store_ids(&stores);
        progress.step(2, "Collecting store names");

        // 3. Week metadata and profile
        progress.step(2, "Loading week and profile");
        let week = self
            .store
            .find_week(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Week {}", reference)))?;
        let user = self
            .store
            .find_user_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User profile".to_string()))?;
        progress.step(3, "Loading week and profile");

        // 4. Plan lines, page by page
        progress.step(3, "Loading weekly plan lines");
        let estimated = self.store.count_plan_lines(reference, &store_names).await?;
        progress.estimate(usize::try_from(estimated).unwrap_or_default());

        let store = self.store.clone();
        let names = &store_names;
        let lines = fetch_all_pages(
            self.page_size,
            |page| {
                let store = store.clone();
                async move { store.plan_lines_page(reference, names, page).await }
            },
            |p| progress.records(p.records),
        )
        .await?;
        progress.step(4, "Loading weekly plan lines");

        // 5. Amendments keyed by (store, stock code)
        progress.step(4, "Loading amendments");
        let amendments = self.store.amendments_for_week(reference, &store_ids).await?;
        let lookup = AmendmentLookup::build(amendments);
        if lookup.duplicates() > 0 {
            tracing::warn!(
                duplicates = lookup.duplicates(),
                "Duplicate amendments for the same store and stock code; kept the latest"
            );
        }
        progress.step(5, "Loading amendments");

        // 6. Submissions, kept alongside
        progress.step(5, "Loading submissions");
        let submissions = self.store.submissions_for_week(reference, &store_ids).await?;
        progress.step(6, "Loading submissions");

        // 7. Join
        progress.step(6, "Joining plan lines with amendments");
        let index = StoreNameIndex::build(&stores);
        let (items, diagnostics) = join_plan_lines(lines, &index, &lookup);
        if diagnostics.mismatched_lines > 0 {
            tracing::warn!(
                mismatched = diagnostics.mismatched_lines,
                names = ?diagnostics.unresolved_store_names.keys().collect::<Vec<_>>(),
                "Plan lines reference stores missing from the hierarchy"
            );
        }
        if !diagnostics.ambiguous_store_names.is_empty() {
            tracing::warn!(
                names = ?diagnostics.ambiguous_store_names,
                "Store names shared by several stores; first match used"
            );
        }
        progress.step(7, "Joining plan lines with amendments");

        // 8. Per-store view
        progress.step(7, "Building store datasets");
        let store_datasets = build_store_datasets(&stores, &items, &submissions);
        progress.step(8, "Building store datasets");

        // 9. Cache and finish
        progress.finish("Complete");
        let result = Arc::new(WeeklyReconciliation {
            week,
            user,
            stores,
            items,
            store_datasets,
            submissions,
            diagnostics,
            progress: progress.snapshot(),
        });
        self.cache.set(key, result.clone()).await;

        tracing::info!(
            reference,
            stores = result.stores.len(),
            items = result.items.len(),
            amended = result.diagnostics.lines_with_amendments,
            "Weekly reconciliation loaded"
        );

        Ok(result)
    }

    /// Drop all cached results
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }
}
