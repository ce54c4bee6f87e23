//! User profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ManagerRole;
use crate::error::ModelError;

/// Roles a signed-in user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    StoreManager,
    AreaManager,
    RegionalManager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::StoreManager => "store_manager",
            UserRole::AreaManager => "area_manager",
            UserRole::RegionalManager => "regional_manager",
            UserRole::Admin => "admin",
        }
    }

    /// Position in the store hierarchy, if this role is a management role
    pub fn manager_role(&self) -> Option<ManagerRole> {
        match self {
            UserRole::StoreManager => Some(ManagerRole::StoreManager),
            UserRole::AreaManager => Some(ManagerRole::AreaManager),
            UserRole::RegionalManager => Some(ManagerRole::RegionalManager),
            UserRole::Customer | UserRole::Admin => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(UserRole::Customer),
            "store_manager" => Ok(UserRole::StoreManager),
            "area_manager" => Ok(UserRole::AreaManager),
            "regional_manager" => Ok(UserRole::RegionalManager),
            "admin" => Ok(UserRole::Admin),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

/// Profile of the user requesting data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque identity issued by the identity provider
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub store_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
