use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DirectoryError, Identity, NewUser, User, UserDirectory};

type UserRow = (Uuid, String, String, String, Option<String>, Option<String>);

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_user(row: UserRow) -> User {
    let (uuid, name, email, password_hash, phone_number, photo) = row;
    User {
        identity: Identity {
            uuid,
            name,
            email,
            phone_number,
            photo,
        },
        password_hash,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505")
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT uuid, name, email, password, phone_number, photo
            FROM users
            WHERE uuid = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?
        .map(into_user)
        .ok_or(DirectoryError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT uuid, name, email, password, phone_number, photo
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(into_user)
        .ok_or(DirectoryError::NotFound)
    }

    async fn register(&self, user: NewUser) -> Result<Identity, DirectoryError> {
        // Soft-deleted rows still hold their email.
        let existing = sqlx::query_scalar::<_, Uuid>("SELECT uuid FROM users WHERE email = $1")
            .bind(&user.email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(DirectoryError::Duplicate);
        }

        let uuid = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (uuid, name, email, password, phone_number, photo, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            "#,
        )
        .bind(uuid)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(&user.photo)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::Duplicate
            } else {
                DirectoryError::from(e)
            }
        })?;

        Ok(Identity {
            uuid,
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
            photo: user.photo,
        })
    }
}
