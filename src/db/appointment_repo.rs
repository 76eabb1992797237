// src/db/appointment_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::appointment::{Appointment, AppointmentStatus},
};

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>, AppError>;

    /// Reserva só se o horário estiver livre; None caso contrário.
    async fn reserve(&self, appointment_id: Uuid, customer_id: Uuid)
        -> Result<Option<Appointment>, AppError>;

    async fn count_by_status(&self, customer_id: Uuid)
        -> Result<Vec<(AppointmentStatus, i64)>, AppError>;
}

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for AppointmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(appointment)
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE customer_id = $1 ORDER BY start_time DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    async fn reserve(
        &self,
        appointment_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Appointment>, AppError> {
        // UPDATE condicional: duas reservas simultâneas não pegam o mesmo horário
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $3, customer_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = $4 AND customer_id IS NULL
            RETURNING *
            "#,
        )
        .bind(appointment_id)
        .bind(customer_id)
        .bind(AppointmentStatus::Reserved)
        .bind(AppointmentStatus::Available)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    async fn count_by_status(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<(AppointmentStatus, i64)>, AppError> {
        let counts = sqlx::query_as::<_, (AppointmentStatus, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM appointments
            WHERE customer_id = $1
            GROUP BY status
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
