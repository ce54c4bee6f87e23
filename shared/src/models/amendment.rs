//! Amendment and submission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ManagerRole;
use crate::error::ModelError;

/// Workflow status of an amendment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmendmentStatus {
    /// Saved by a manager, still editable
    Draft,
    /// Sent up by an area manager, awaiting the regional manager
    Pending,
    /// Sent to head office
    Submitted,
    Approved,
}

impl AmendmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmendmentStatus::Draft => "draft",
            AmendmentStatus::Pending => "pending",
            AmendmentStatus::Submitted => "submitted",
            AmendmentStatus::Approved => "approved",
        }
    }

    pub fn can_transition_to(&self, next: AmendmentStatus) -> bool {
        use AmendmentStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Submitted)
                | (Pending, Submitted)
                | (Pending, Approved)
                | (Submitted, Approved)
                | (Pending, Draft)
                | (Submitted, Draft)
                | (Approved, Draft)
        )
    }

    /// Managers may still change the quantity
    pub fn is_editable(&self) -> bool {
        matches!(self, AmendmentStatus::Draft)
    }
}

impl std::fmt::Display for AmendmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmendmentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(AmendmentStatus::Draft),
            "pending" => Ok(AmendmentStatus::Pending),
            "submitted" => Ok(AmendmentStatus::Submitted),
            "approved" => Ok(AmendmentStatus::Approved),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// Lookup key joining an amendment to a plan line
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AmendmentKey {
    pub store_id: Uuid,
    pub stock_code: String,
}

impl AmendmentKey {
    pub fn new(store_id: Uuid, stock_code: impl Into<String>) -> Self {
        Self {
            store_id,
            stock_code: stock_code.into(),
        }
    }
}

impl std::fmt::Display for AmendmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.store_id, self.stock_code)
    }
}

/// A manager's quantity override for one (store, stock code) in a week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub id: Uuid,
    pub reference: String,
    pub store_id: Uuid,
    pub stock_code: String,
    pub amended_qty: i32,
    pub justification: String,
    pub status: AmendmentStatus,
    pub created_by: String,
    pub created_by_role: ManagerRole,
    pub admin_notes: Option<String>,
    pub approved_qty: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AmendmentRecord {
    pub fn key(&self) -> AmendmentKey {
        AmendmentKey::new(self.store_id, self.stock_code.clone())
    }

    /// Quantity that applies: the approved figure once an admin has set one
    pub fn effective_qty(&self) -> i32 {
        self.approved_qty.unwrap_or(self.amended_qty)
    }
}

/// A store's submission marker for a week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub reference: String,
    pub store_id: Uuid,
    pub status: AmendmentStatus,
    pub submitted_by: String,
    pub submitted_by_role: ManagerRole,
    pub submitted_at: DateTime<Utc>,
}
