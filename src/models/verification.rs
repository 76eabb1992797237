// src/models/verification.rs

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Código de uso único enviado por e-mail.
/// `valid = true` significa que o código ainda não foi consumido.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeCode {
    pub id: Uuid,
    pub identifier: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub validity_minutes: i32,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.validity_minutes))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}
