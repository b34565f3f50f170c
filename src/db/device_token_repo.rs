// src/db/device_token_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::notification::DeviceToken};

#[derive(Clone)]
pub struct DeviceTokenRepository {
    pool: PgPool,
}

impl DeviceTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Registrar o mesmo token duas vezes não duplica a linha
    pub async fn register(&self, user_id: Uuid, token: &str) -> Result<DeviceToken, AppError> {
        let device_token = sqlx::query_as::<_, DeviceToken>(
            r#"
            INSERT INTO device_tokens (user_id, token)
            VALUES ($1, $2)
            ON CONFLICT (user_id, token) DO UPDATE SET token = EXCLUDED.token
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(device_token)
    }

    pub async fn revoke(&self, user_id: Uuid, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let tokens = sqlx::query_scalar::<_, String>(
            "SELECT token FROM device_tokens WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    pub async fn delete_many(&self, user_id: Uuid, tokens: &[String]) -> Result<u64, AppError> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = ANY($2)")
            .bind(user_id)
            .bind(tokens)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
