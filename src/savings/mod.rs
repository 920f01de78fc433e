/// Saving goals
///
/// A saving goal belongs to one user and is denominated in a currency from
/// the read-only currency table. Responses embed the owner and the
/// currency's country flag.

mod memory;
mod postgres;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::users::Identity;

pub use self::memory::InMemorySavingsRepository;
pub use self::postgres::PgSavingsRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillingPlan {
    Daily,
    Weekly,
    Monthly,
}

impl FillingPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillingPlan::Daily => "daily",
            FillingPlan::Weekly => "weekly",
            FillingPlan::Monthly => "monthly",
        }
    }
}

impl fmt::Display for FillingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillingPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(FillingPlan::Daily),
            "weekly" => Ok(FillingPlan::Weekly),
            "monthly" => Ok(FillingPlan::Monthly),
            _ => Err(ValidationError::InvalidFormat("filling_plan".to_string())),
        }
    }
}

/// Currency reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub currency_code: String,
    pub country_name: String,
    pub currency_name: String,
    pub country_flag: String,
    pub currency_symbol: String,
}

#[derive(Debug, Clone)]
pub struct NewSaving {
    pub name: String,
    pub target_amount: f64,
    pub currency_code: String,
    pub image: String,
    pub filling_plan: FillingPlan,
    pub filling_nominal: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingResponse {
    pub uuid: Uuid,
    pub user: Identity,
    pub name: String,
    pub target_amount: f64,
    pub currency_code: String,
    pub currency_flag: String,
    pub image: String,
    pub filling_plan: FillingPlan,
    pub filling_nominal: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SavingsError {
    #[error("unknown currency {0}")]
    UnknownCurrency(String),
    #[error("savings storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for SavingsError {
    fn from(err: sqlx::Error) -> Self {
        SavingsError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait SavingsRepository: Send + Sync {
    /// # Errors
    /// `SavingsError::UnknownCurrency` if the currency code is not in the table
    async fn create(&self, saving: NewSaving, owner: &Identity) -> Result<SavingResponse, SavingsError>;

    async fn list_for_user(&self, owner: &Identity) -> Result<Vec<SavingResponse>, SavingsError>;
}
