use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DirectoryError, Identity, NewUser, User, UserDirectory};

/// Process-local user directory for tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a user, as if the account had been deleted
    pub async fn remove(&self, uuid: Uuid) -> Option<User> {
        self.users.write().await.remove(&uuid)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<User, DirectoryError> {
        self.users
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.identity.email == email)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn register(&self, user: NewUser) -> Result<Identity, DirectoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.identity.email == user.email) {
            return Err(DirectoryError::Duplicate);
        }

        let identity = Identity {
            uuid: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
            photo: user.photo,
        };
        users.insert(
            identity.uuid,
            User {
                identity: identity.clone(),
                password_hash: user.password_hash,
            },
        );

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            phone_number: Some("08123456789".to_string()),
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_find() {
        let directory = InMemoryUserDirectory::new();
        let identity = directory.register(new_user("a@x.com")).await.unwrap();

        let by_uuid = directory.find_by_uuid(identity.uuid).await.unwrap();
        let by_email = directory.find_by_email("a@x.com").await.unwrap();
        assert_eq!(by_uuid.identity, identity);
        assert_eq!(by_email.identity, identity);
        assert_eq!(by_email.password_hash, "$argon2id$stub");
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let directory = InMemoryUserDirectory::new();
        directory.register(new_user("a@x.com")).await.unwrap();

        let result = directory.register(new_user("a@x.com")).await;
        assert!(matches!(result, Err(DirectoryError::Duplicate)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let directory = InMemoryUserDirectory::new();

        assert!(matches!(directory.find_by_uuid(Uuid::new_v4()).await, Err(DirectoryError::NotFound)));
        assert!(matches!(directory.find_by_email("nobody@x.com").await, Err(DirectoryError::NotFound)));
    }

    #[test]
    fn test_identity_serializes_photo_as_image() {
        let identity = Identity {
            uuid: Uuid::nil(),
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            phone_number: None,
            photo: Some("uploads/a.png".to_string()),
        };
        let value = serde_json::to_value(&identity).unwrap();

        assert_eq!(value["image"], "uploads/a.png");
        assert!(value.get("photo").is_none());
    }
}
