// src/db/otp_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::verification::OneTimeCode};

/// Registro e validação dos códigos de uso único, por identificador (e-mail).
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Descarta os códigos anteriores do identificador e grava o novo.
    async fn replace_code(
        &self,
        identifier: &str,
        token: &str,
        validity_minutes: i32,
    ) -> Result<OneTimeCode, AppError>;

    async fn find_code(&self, identifier: &str, token: &str)
        -> Result<Option<OneTimeCode>, AppError>;

    /// Consome o código. false se ele já havia sido consumido.
    async fn invalidate(&self, id: Uuid) -> Result<bool, AppError>;

    /// Identificadores distintos com código ainda não consumido.
    async fn pending_identifiers(&self) -> Result<Vec<String>, AppError>;
}

#[derive(Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for OtpRepository {
    async fn replace_code(
        &self,
        identifier: &str,
        token: &str,
        validity_minutes: i32,
    ) -> Result<OneTimeCode, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM otps WHERE identifier = $1")
            .bind(identifier)
            .execute(&mut *tx)
            .await?;

        let code = sqlx::query_as::<_, OneTimeCode>(
            r#"
            INSERT INTO otps (identifier, token, validity_minutes)
            VALUES ($1, $2, $3)
            RETURNING id, identifier, token, validity_minutes, valid, created_at
            "#,
        )
        .bind(identifier)
        .bind(token)
        .bind(validity_minutes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(code)
    }

    async fn find_code(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<OneTimeCode>, AppError> {
        let code = sqlx::query_as::<_, OneTimeCode>(
            r#"
            SELECT id, identifier, token, validity_minutes, valid, created_at
            FROM otps
            WHERE identifier = $1 AND token = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn invalidate(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE otps SET valid = FALSE WHERE id = $1 AND valid")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn pending_identifiers(&self) -> Result<Vec<String>, AppError> {
        let identifiers = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT identifier FROM otps WHERE valid ORDER BY identifier",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(identifiers)
    }
}
