use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "customer")]
    Customer,
    #[serde(rename = "rider")]
    Rider,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Rider => "rider",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Role::Customer, Role::Rider, Role::Admin]
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("role", s))
    }
}

/// A customer, rider, or admin account as stored in the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub role: Role,
    /// Meaningful for riders; customers and admins are always active.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile mutation; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl Profile {
    pub fn apply_update(&mut self, update: &ProfileUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.full_name {
            self.full_name = name.clone();
        }
        if let Some(phone) = &update.phone_number {
            self.phone_number = phone.clone();
        }
        if let Some(address) = &update.address {
            self.address = address.clone();
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }
}

/// Input for onboarding a delivery rider through the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRider {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
}
