//! Amendment workflow
//!
//! Managers save draft quantity overrides per (week, store, stock code) and
//! send a store's drafts upward. Admins approve or reset them.

use serde::{Deserialize, Serialize};
use shared::{AmendmentRecord, AmendmentStatus, ManagerRole, SubmissionRecord};
use uuid::Uuid;
use validator::Validate;

use super::hierarchy::HierarchyService;
use crate::error::{AppError, AppResult};
use crate::store::{NewAmendment, NewSubmission, SharedStore};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AmendmentInput {
    #[validate(length(min = 1, max = 64))]
    pub reference: String,
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 40))]
    pub stock_code: String,
    #[validate(range(min = 0))]
    pub amended_qty: i32,
    #[validate(length(min = 1, max = 1000, message = "A justification is required"))]
    pub justification: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApprovalInput {
    #[validate(range(min = 0))]
    pub approved_qty: i32,
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}

/// What a store submission moved
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub submission: SubmissionRecord,
    pub amendments_moved: u64,
}

#[derive(Clone)]
pub struct AmendmentService {
    store: SharedStore,
}

impl AmendmentService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create or update the draft for the input's (week, store, stock code)
    pub async fn upsert_draft(
        &self,
        role: ManagerRole,
        user_id: &str,
        input: AmendmentInput,
    ) -> AppResult<AmendmentRecord> {
        input.validate()?;
        shared::validate_stock_code(&input.stock_code)
            .map_err(|m| AppError::validation("stock_code", m))?;
        shared::validate_justification(input.amended_qty, &input.justification)
            .map_err(|m| AppError::validation("justification", m))?;
        self.ensure_manages(role, user_id, input.store_id).await?;

        if self.store.find_week(&input.reference).await?.is_none() {
            return Err(AppError::NotFound(format!("Week {}", input.reference)));
        }

        let existing = self
            .store
            .find_amendment_for(&input.reference, input.store_id, &input.stock_code)
            .await?;

        let record = match existing {
            Some(mut current) => {
                if !current.status.is_editable() {
                    return Err(AppError::InvalidStateTransition(format!(
                        "Amendment {} is {} and can no longer be edited",
                        current.key(),
                        current.status
                    )));
                }
                current.amended_qty = input.amended_qty;
                current.justification = input.justification;
                self.store.update_amendment(&current).await?
            }
            None => {
                self.store
                    .insert_amendment(NewAmendment {
                        reference: input.reference,
                        store_id: input.store_id,
                        stock_code: input.stock_code,
                        amended_qty: input.amended_qty,
                        justification: input.justification,
                        status: AmendmentStatus::Draft,
                        created_by: user_id.to_string(),
                        created_by_role: role,
                    })
                    .await?
            }
        };

        tracing::info!(key = %record.key(), reference = %record.reference, "Amendment draft saved");
        Ok(record)
    }

    /// Send a store's drafts upward.
    ///
    /// Area managers move drafts to `pending` for their regional manager.
    /// Regional managers move drafts and pending amendments to `submitted`.
    pub async fn submit_store(
        &self,
        role: ManagerRole,
        user_id: &str,
        reference: &str,
        store_id: Uuid,
    ) -> AppResult<SubmissionOutcome> {
        self.ensure_manages(role, user_id, store_id).await?;

        let (target, sources): (AmendmentStatus, &[AmendmentStatus]) = match role {
            ManagerRole::AreaManager => (AmendmentStatus::Pending, &[AmendmentStatus::Draft]),
            ManagerRole::RegionalManager => (
                AmendmentStatus::Submitted,
                &[AmendmentStatus::Draft, AmendmentStatus::Pending],
            ),
            ManagerRole::StoreManager => return Err(AppError::InsufficientPermissions),
        };

        let mut moved = 0;
        for from in sources {
            moved += self
                .store
                .set_amendment_status(reference, store_id, *from, target)
                .await?;
        }

        let submission = self
            .store
            .insert_submission(NewSubmission {
                reference: reference.to_string(),
                store_id,
                status: target,
                submitted_by: user_id.to_string(),
                submitted_by_role: role,
            })
            .await?;

        tracing::info!(
            reference,
            store_id = %store_id,
            status = %target,
            moved,
            "Store amendments submitted"
        );

        Ok(SubmissionOutcome {
            submission,
            amendments_moved: moved,
        })
    }

    /// Admin approval with the quantity head office accepts
    pub async fn approve(&self, id: Uuid, input: ApprovalInput) -> AppResult<AmendmentRecord> {
        input.validate()?;
        let mut record = self.find(id).await?;
        self.check_transition(&record, AmendmentStatus::Approved)?;

        record.status = AmendmentStatus::Approved;
        record.approved_qty = Some(input.approved_qty);
        record.admin_notes = input.admin_notes;
        let record = self.store.update_amendment(&record).await?;

        tracing::info!(key = %record.key(), approved_qty = input.approved_qty, "Amendment approved");
        Ok(record)
    }

    /// Send an amendment back to draft, clearing any approval
    pub async fn reset_to_draft(&self, id: Uuid) -> AppResult<AmendmentRecord> {
        let mut record = self.find(id).await?;
        self.check_transition(&record, AmendmentStatus::Draft)?;

        record.status = AmendmentStatus::Draft;
        record.approved_qty = None;
        self.store.update_amendment(&record).await
    }

    /// Hard delete of a store's submissions and amendments for a week
    pub async fn reset_submissions(&self, reference: &str, store_id: Uuid) -> AppResult<(u64, u64)> {
        let submissions = self.store.delete_submissions(reference, store_id).await?;
        let amendments = self.store.delete_amendments(reference, store_id).await?;

        tracing::warn!(
            reference,
            store_id = %store_id,
            submissions,
            amendments,
            "Store submissions reset"
        );
        Ok((submissions, amendments))
    }

    async fn find(&self, id: Uuid) -> AppResult<AmendmentRecord> {
        self.store
            .find_amendment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Amendment".to_string()))
    }

    fn check_transition(&self, record: &AmendmentRecord, next: AmendmentStatus) -> AppResult<()> {
        if record.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStateTransition(format!(
                "Amendment {} cannot move from {} to {}",
                record.key(),
                record.status,
                next
            )))
        }
    }

    async fn ensure_manages(&self, role: ManagerRole, user_id: &str, store_id: Uuid) -> AppResult<()> {
        let manages = HierarchyService::new(self.store.clone())
            .manages_store(role, user_id, store_id)
            .await?;
        if manages {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}
