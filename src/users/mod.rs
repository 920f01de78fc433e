/// User directory
///
/// Lookup and registration of account holders. Soft-deleted users are
/// invisible to lookups but still reserve their email address.

mod memory;
mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use self::memory::InMemoryUserDirectory;
pub use self::postgres::PgUserDirectory;

/// Public view of an account holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(rename = "image")]
    pub photo: Option<String>,
}

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub identity: Identity,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("email already exists")]
    Duplicate,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        DirectoryError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<User, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    /// # Errors
    /// `DirectoryError::Duplicate` if the email is already taken
    async fn register(&self, user: NewUser) -> Result<Identity, DirectoryError>;
}
