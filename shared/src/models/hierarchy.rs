//! Store management hierarchy models

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;

/// A level in the store management chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerRole {
    StoreManager,
    AreaManager,
    RegionalManager,
}

impl ManagerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerRole::StoreManager => "store_manager",
            ManagerRole::AreaManager => "area_manager",
            ManagerRole::RegionalManager => "regional_manager",
        }
    }

    /// Column of the hierarchy view holding the manager id for this level
    pub fn manager_column(&self) -> &'static str {
        match self {
            ManagerRole::StoreManager => "store_manager_id",
            ManagerRole::AreaManager => "area_manager_id",
            ManagerRole::RegionalManager => "regional_manager_id",
        }
    }

    /// Next level up the chain, if any
    pub fn escalates_to(&self) -> Option<ManagerRole> {
        match self {
            ManagerRole::StoreManager => Some(ManagerRole::AreaManager),
            ManagerRole::AreaManager => Some(ManagerRole::RegionalManager),
            ManagerRole::RegionalManager => None,
        }
    }
}

impl std::fmt::Display for ManagerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManagerRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "store_manager" => Ok(ManagerRole::StoreManager),
            "area_manager" => Ok(ManagerRole::AreaManager),
            "regional_manager" => Ok(ManagerRole::RegionalManager),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// The occupant of one management level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerContact {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One store's current management chain.
///
/// Each level holds zero or one occupant; `None` means the position is vacant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHierarchy {
    pub store_id: Uuid,
    pub store_name: String,
    pub store_code: Option<String>,
    pub store_manager: Option<ManagerContact>,
    pub area_manager: Option<ManagerContact>,
    pub regional_manager: Option<ManagerContact>,
}

/// A vacant position together with who covers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    pub store_id: Uuid,
    pub store_name: String,
    pub level: ManagerRole,
    pub covered_by_level: Option<ManagerRole>,
    pub covered_by: Option<ManagerContact>,
}

impl StoreHierarchy {
    pub fn manager_at(&self, level: ManagerRole) -> Option<&ManagerContact> {
        match level {
            ManagerRole::StoreManager => self.store_manager.as_ref(),
            ManagerRole::AreaManager => self.area_manager.as_ref(),
            ManagerRole::RegionalManager => self.regional_manager.as_ref(),
        }
    }

    pub fn is_vacant(&self, level: ManagerRole) -> bool {
        self.manager_at(level).is_none()
    }

    /// Whether `user_id` occupies `level` for this store
    pub fn is_managed_by(&self, level: ManagerRole, user_id: &str) -> bool {
        self.manager_at(level).is_some_and(|m| m.id == user_id)
    }

    /// Nearest occupied level at or above `level`
    pub fn escalation_for(&self, level: ManagerRole) -> Option<(ManagerRole, &ManagerContact)> {
        let mut current = Some(level);
        while let Some(l) = current {
            if let Some(contact) = self.manager_at(l) {
                return Some((l, contact));
            }
            current = l.escalates_to();
        }
        None
    }

    /// Who answers for the store: store manager, else area, else regional
    pub fn escalation_contact(&self) -> Option<(ManagerRole, &ManagerContact)> {
        self.escalation_for(ManagerRole::StoreManager)
    }

    /// Vacant levels, each paired with the level that covers it
    pub fn vacancies(&self) -> Vec<Vacancy> {
        [
            ManagerRole::StoreManager,
            ManagerRole::AreaManager,
            ManagerRole::RegionalManager,
        ]
        .into_iter()
        .filter(|level| self.is_vacant(*level))
        .map(|level| {
            let cover = level.escalates_to().and_then(|up| self.escalation_for(up));
            Vacancy {
                store_id: self.store_id,
                store_name: self.store_name.clone(),
                level,
                covered_by_level: cover.map(|(l, _)| l),
                covered_by: cover.map(|(_, c)| c.clone()),
            }
        })
        .collect()
    }
}
