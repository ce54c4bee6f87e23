//! In-process cache for weekly reconciliation results

use std::collections::HashMap;
use std::sync::Arc;

use shared::{ManagerRole, WeeklyReconciliation};
use tokio::sync::RwLock;

/// Identity of one reconciliation load
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub role: ManagerRole,
    pub user_id: String,
    pub reference: String,
}

impl CacheKey {
    pub fn new(role: ManagerRole, user_id: &str, reference: &str) -> Self {
        Self {
            role,
            user_id: user_id.to_string(),
            reference: reference.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.role, self.user_id, self.reference)
    }
}

/// Memoized reconciliation results.
///
/// Entries never expire; they stay until `clear` or `invalidate_week` is
/// called, so results can be stale if the underlying rows change.
#[derive(Clone, Default)]
pub struct ReconciliationCache {
    entries: Arc<RwLock<HashMap<CacheKey, Arc<WeeklyReconciliation>>>>,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<WeeklyReconciliation>> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: CacheKey, value: Arc<WeeklyReconciliation>) {
        tracing::debug!(key = %key, "Caching reconciliation");
        self.entries.write().await.insert(key, value);
    }

    /// Drop every entry, returning how many were removed
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        tracing::info!(removed, "Reconciliation cache cleared");
        removed
    }

    /// Drop entries for one week reference
    pub async fn invalidate_week(&self, reference: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.reference != reference);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
