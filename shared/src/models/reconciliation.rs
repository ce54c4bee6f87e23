//! Weekly reconciliation result models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{
    AmendmentRecord, StoreHierarchy, SubmissionRecord, UserProfile, WeekSelection, WeeklyPlanLine,
};

/// Number of logical steps a reconciliation run reports progress over
pub const RECONCILIATION_STEPS: u32 = 9;

/// Outcome of matching a plan line's store name to the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoreResolution {
    Resolved(Uuid),
    Unresolved(String),
}

impl StoreResolution {
    pub fn store_id(&self) -> Option<Uuid> {
        match self {
            StoreResolution::Resolved(id) => Some(*id),
            StoreResolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, StoreResolution::Resolved(_))
    }
}

/// A plan line with its store resolved and any amendment attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledPlanItem {
    #[serde(flatten)]
    pub line: WeeklyPlanLine,
    pub store: StoreResolution,
    pub has_amendment: bool,
    pub amendment: Option<AmendmentRecord>,
}

impl ReconciledPlanItem {
    pub fn store_id(&self) -> Option<Uuid> {
        self.store.store_id()
    }

    /// Amended quantity if an override exists, otherwise the planned quantity
    pub fn effective_qty(&self) -> i32 {
        self.amendment
            .as_ref()
            .map(AmendmentRecord::effective_qty)
            .unwrap_or_else(|| self.line.planned_qty())
    }
}

/// Every accessible store with its slice of the week's items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDataset {
    pub store: StoreHierarchy,
    pub items: Vec<ReconciledPlanItem>,
    /// False when nothing was uploaded for this store this week
    pub has_weekly_plan_data: bool,
    pub amendment_count: usize,
    pub submission: Option<SubmissionRecord>,
}

/// Counters describing how cleanly the join went
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDiagnostics {
    pub matched_lines: usize,
    pub mismatched_lines: usize,
    pub lines_with_amendments: usize,
    /// Store names seen on plan lines but absent from the hierarchy, with line counts
    pub unresolved_store_names: BTreeMap<String, usize>,
    /// Names shared by more than one store in the hierarchy
    pub ambiguous_store_names: Vec<String>,
}

/// Progress of a long-running reconciliation load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationProgress {
    pub current_operation: String,
    pub completed: u32,
    pub total: u32,
    pub actual_records_loaded: usize,
    pub estimated_total: usize,
}

impl ReconciliationProgress {
    pub fn start() -> Self {
        Self {
            current_operation: "Starting".to_string(),
            completed: 0,
            total: RECONCILIATION_STEPS,
            actual_records_loaded: 0,
            estimated_total: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Everything a manager needs to review one week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReconciliation {
    pub week: WeekSelection,
    pub user: UserProfile,
    pub stores: Vec<StoreHierarchy>,
    pub items: Vec<ReconciledPlanItem>,
    pub store_datasets: Vec<StoreDataset>,
    pub submissions: Vec<SubmissionRecord>,
    pub diagnostics: JoinDiagnostics,
    pub progress: ReconciliationProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_uses_camel_case() {
        let json = serde_json::to_value(ReconciliationProgress::start()).unwrap();
        assert_eq!(json["currentOperation"], "Starting");
        assert_eq!(json["total"], 9);
        assert!(json.get("actualRecordsLoaded").is_some());
    }

    #[test]
    fn test_resolution_is_tagged() {
        let json = serde_json::to_value(StoreResolution::Unresolved("Quay Rd".into())).unwrap();
        assert_eq!(json["kind"], "unresolved");
        assert_eq!(json["value"], "Quay Rd");
    }
}
