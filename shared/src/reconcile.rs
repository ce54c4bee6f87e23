//! Weekly plan reconciliation
//!
//! Pure joining stages used by the backend orchestrator and the browser:
//! - filtering the hierarchy to the stores a manager may see
//! - resolving plan-line store names to store ids
//! - building the amendment lookup
//! - annotating plan lines and grouping them per store

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::models::{
    AmendmentKey, AmendmentRecord, JoinDiagnostics, ManagerRole, ReconciledPlanItem,
    StoreDataset, StoreHierarchy, StoreResolution, SubmissionRecord, WeeklyPlanLine,
};

/// Stores in `hierarchy` where `user_id` holds the `role` position
pub fn accessible_stores(
    hierarchy: &[StoreHierarchy],
    role: ManagerRole,
    user_id: &str,
) -> Vec<StoreHierarchy> {
    hierarchy
        .iter()
        .filter(|s| s.is_managed_by(role, user_id))
        .cloned()
        .collect()
}

/// Distinct store names, trimmed and sorted, as used to filter plan lines.
///
/// Uploaded plan lines are stored trimmed, so the filter must match the same form
/// the name index resolves against.
pub fn accessible_store_names(stores: &[StoreHierarchy]) -> Vec<String> {
    stores
        .iter()
        .map(|s| normalize_store_name(&s.store_name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn accessible_store_ids(stores: &[StoreHierarchy]) -> Vec<Uuid> {
    stores
        .iter()
        .map(|s| s.store_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Name to id lookup over the accessible hierarchy.
///
/// When two stores share a name the first one in input order wins and the
/// name is recorded as ambiguous.
#[derive(Debug, Clone, Default)]
pub struct StoreNameIndex {
    by_name: HashMap<String, Uuid>,
    ambiguous: BTreeSet<String>,
}

impl StoreNameIndex {
    pub fn build(stores: &[StoreHierarchy]) -> Self {
        let mut index = Self::default();
        for store in stores {
            let name = normalize_store_name(&store.store_name);
            match index.by_name.get(&name) {
                Some(existing) if *existing != store.store_id => {
                    index.ambiguous.insert(name);
                }
                Some(_) => {}
                None => {
                    index.by_name.insert(name, store.store_id);
                }
            }
        }
        index
    }

    pub fn resolve(&self, store_name: &str) -> StoreResolution {
        match self.by_name.get(&normalize_store_name(store_name)) {
            Some(id) => StoreResolution::Resolved(*id),
            None => StoreResolution::Unresolved(store_name.to_string()),
        }
    }

    pub fn ambiguous_names(&self) -> Vec<String> {
        self.ambiguous.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn normalize_store_name(name: &str) -> String {
    name.trim().to_string()
}

/// Amendment per (store, stock code).
///
/// Duplicate keys keep the record with the latest `created_at`; on a tie the
/// record that came later in the input wins.
#[derive(Debug, Clone, Default)]
pub struct AmendmentLookup {
    by_key: HashMap<AmendmentKey, AmendmentRecord>,
    duplicates: usize,
}

impl AmendmentLookup {
    pub fn build(records: impl IntoIterator<Item = AmendmentRecord>) -> Self {
        let mut lookup = Self::default();
        for record in records {
            let key = record.key();
            match lookup.by_key.get(&key) {
                Some(existing) => {
                    lookup.duplicates += 1;
                    if record.created_at >= existing.created_at {
                        lookup.by_key.insert(key, record);
                    }
                }
                None => {
                    lookup.by_key.insert(key, record);
                }
            }
        }
        lookup
    }

    pub fn get(&self, key: &AmendmentKey) -> Option<&AmendmentRecord> {
        self.by_key.get(key)
    }

    /// Records dropped because a newer one shared their key
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Annotate every plan line with its store and amendment.
///
/// Lines whose store cannot be resolved are kept, carry no amendment, and are
/// counted in the diagnostics.
pub fn join_plan_lines(
    lines: Vec<WeeklyPlanLine>,
    stores: &StoreNameIndex,
    amendments: &AmendmentLookup,
) -> (Vec<ReconciledPlanItem>, JoinDiagnostics) {
    let mut diagnostics = JoinDiagnostics {
        ambiguous_store_names: stores.ambiguous_names(),
        ..Default::default()
    };

    let items = lines
        .into_iter()
        .map(|line| {
            let store = stores.resolve(&line.store_name);
            let amendment = match &store {
                StoreResolution::Resolved(store_id) => {
                    diagnostics.matched_lines += 1;
                    amendments
                        .get(&AmendmentKey::new(*store_id, line.stock_code.clone()))
                        .cloned()
                }
                StoreResolution::Unresolved(name) => {
                    diagnostics.mismatched_lines += 1;
                    *diagnostics
                        .unresolved_store_names
                        .entry(name.clone())
                        .or_default() += 1;
                    None
                }
            };
            if amendment.is_some() {
                diagnostics.lines_with_amendments += 1;
            }
            ReconciledPlanItem {
                line,
                store,
                has_amendment: amendment.is_some(),
                amendment,
            }
        })
        .collect();

    (items, diagnostics)
}

/// Group items under every accessible store, including stores with no lines
pub fn build_store_datasets(
    stores: &[StoreHierarchy],
    items: &[ReconciledPlanItem],
    submissions: &[SubmissionRecord],
) -> Vec<StoreDataset> {
    let mut by_store: HashMap<Uuid, Vec<ReconciledPlanItem>> = HashMap::new();
    for item in items {
        if let Some(store_id) = item.store_id() {
            by_store.entry(store_id).or_default().push(item.clone());
        }
    }

    let mut seen = BTreeSet::new();
    stores
        .iter()
        .filter(|s| seen.insert(s.store_id))
        .map(|store| {
            let items = by_store.remove(&store.store_id).unwrap_or_default();
            let submission = submissions
                .iter()
                .filter(|s| s.store_id == store.store_id)
                .max_by_key(|s| s.submitted_at)
                .cloned();
            StoreDataset {
                store: store.clone(),
                has_weekly_plan_data: !items.is_empty(),
                amendment_count: items.iter().filter(|i| i.has_amendment).count(),
                items,
                submission,
            }
        })
        .collect()
}
