use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{FillingPlan, NewSaving, SavingResponse, SavingsError, SavingsRepository};
use crate::users::Identity;

type SavingRow = (
    Uuid,
    String,
    f64,
    String,
    String,
    String,
    String,
    f64,
    DateTime<Utc>,
    DateTime<Utc>,
);

pub struct PgSavingsRepository {
    pool: PgPool,
}

impl PgSavingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_response(row: SavingRow, owner: &Identity) -> Result<SavingResponse, SavingsError> {
    let (uuid, name, target_amount, currency_code, currency_flag, image, plan, filling_nominal, created_at, updated_at) = row;
    let filling_plan = plan
        .parse::<FillingPlan>()
        .map_err(|_| SavingsError::Unavailable(format!("stored filling plan {:?} is invalid", plan)))?;

    Ok(SavingResponse {
        uuid,
        user: owner.clone(),
        name,
        target_amount,
        currency_code,
        currency_flag,
        image,
        filling_plan,
        filling_nominal,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl SavingsRepository for PgSavingsRepository {
    async fn create(&self, saving: NewSaving, owner: &Identity) -> Result<SavingResponse, SavingsError> {
        let currency_flag = sqlx::query_scalar::<_, String>(
            "SELECT country_flag FROM currencies WHERE currency_code = $1 AND deleted_at IS NULL",
        )
        .bind(&saving.currency_code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SavingsError::UnknownCurrency(saving.currency_code.clone()))?;

        let uuid = Uuid::new_v4();
        let (created_at, updated_at) = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            r#"
            INSERT INTO savings (uuid, user_uuid, name, target_amount, currency_code, image, filling_plan, filling_nominal, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            RETURNING created_at, updated_at
            "#,
        )
        .bind(uuid)
        .bind(owner.uuid)
        .bind(&saving.name)
        .bind(saving.target_amount)
        .bind(&saving.currency_code)
        .bind(&saving.image)
        .bind(saving.filling_plan.as_str())
        .bind(saving.filling_nominal)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(saving_uuid = %uuid, user_uuid = %owner.uuid, "Saving created");

        Ok(SavingResponse {
            uuid,
            user: owner.clone(),
            name: saving.name,
            target_amount: saving.target_amount,
            currency_code: saving.currency_code,
            currency_flag,
            image: saving.image,
            filling_plan: saving.filling_plan,
            filling_nominal: saving.filling_nominal,
            created_at,
            updated_at,
        })
    }

    async fn list_for_user(&self, owner: &Identity) -> Result<Vec<SavingResponse>, SavingsError> {
        let rows = sqlx::query_as::<_, SavingRow>(
            r#"
            SELECT s.uuid, s.name, s.target_amount, s.currency_code, COALESCE(c.country_flag, ''),
                   s.image, s.filling_plan, s.filling_nominal, s.created_at, s.updated_at
            FROM savings s
            LEFT JOIN currencies c ON c.currency_code = s.currency_code
            WHERE s.user_uuid = $1 AND s.deleted_at IS NULL
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(owner.uuid)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| into_response(row, owner)).collect()
    }
}
