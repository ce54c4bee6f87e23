//! Store hierarchy resolution and vacancy reporting

use shared::{ManagerRole, StoreHierarchy, Vacancy};

use crate::error::{AppError, AppResult};
use crate::store::SharedStore;

/// Resolves which stores a manager may see
#[derive(Clone)]
pub struct HierarchyService {
    store: SharedStore,
}

impl HierarchyService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Stores where `user_id` holds the `role` position.
    ///
    /// An empty set is an error: a manager with no stores has nothing to load.
    pub async fn accessible_stores(
        &self,
        role: ManagerRole,
        user_id: &str,
    ) -> AppResult<Vec<StoreHierarchy>> {
        let stores = self.store.stores_for_manager(role, user_id).await?;

        if stores.is_empty() {
            tracing::warn!(role = %role, user_id, "No stores assigned to manager");
            return Err(AppError::NoAccessibleStores {
                role: role.to_string(),
                user_id: user_id.to_string(),
            });
        }

        tracing::debug!(role = %role, user_id, count = stores.len(), "Resolved accessible stores");
        Ok(stores)
    }

    /// Whether `user_id` manages `store_id` at `role`
    pub async fn manages_store(
        &self,
        role: ManagerRole,
        user_id: &str,
        store_id: uuid::Uuid,
    ) -> AppResult<bool> {
        let stores = self.store.stores_for_manager(role, user_id).await?;
        Ok(stores.iter().any(|s| s.store_id == store_id))
    }

    /// Vacant positions across the manager's stores and who covers each
    pub async fn vacancy_report(&self, role: ManagerRole, user_id: &str) -> AppResult<Vec<Vacancy>> {
        let stores = self.accessible_stores(role, user_id).await?;
        let vacancies: Vec<Vacancy> = stores.iter().flat_map(StoreHierarchy::vacancies).collect();

        let uncovered = vacancies.iter().filter(|v| v.covered_by.is_none()).count();
        if uncovered > 0 {
            tracing::warn!(uncovered, "Vacant positions with nobody above them");
        }

        Ok(vacancies)
    }
}
