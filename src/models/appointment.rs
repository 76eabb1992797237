// src/models/appointment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Mapeia o CREATE TYPE appointment_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Available,
    Reserved,
    Completed,
    CanceledByCustomer,
    CanceledByConsultant,
    MissedByCustomer,
    MissedByConsultant,
}

impl AppointmentStatus {
    pub const MISSED: [AppointmentStatus; 2] = [
        AppointmentStatus::MissedByCustomer,
        AppointmentStatus::MissedByConsultant,
    ];

    pub fn is_missed(self) -> bool {
        Self::MISSED.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    // None enquanto o horário está livre
    pub customer_id: Option<Uuid>,
    pub status: AppointmentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_bookable(&self) -> bool {
        self.status == AppointmentStatus::Available && self.customer_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStatistics {
    pub completed_appointments: i64,
    pub reserved_appointments: i64,
    pub cancelled_by_customer_appointments: i64,
    pub cancelled_by_consultant_appointments: i64,
    pub missed_by_customer_appointments: i64,
    pub missed_by_consultant_appointments: i64,
    pub total_appointments: i64,
}

impl AppointmentStatistics {
    /// Monta as estatísticas a partir das contagens por status (GROUP BY status).
    pub fn from_counts(counts: &[(AppointmentStatus, i64)]) -> Self {
        let mut stats = Self::default();

        for &(status, count) in counts {
            stats.total_appointments += count;
            match status {
                AppointmentStatus::Completed => stats.completed_appointments += count,
                AppointmentStatus::Reserved => stats.reserved_appointments += count,
                AppointmentStatus::CanceledByCustomer => {
                    stats.cancelled_by_customer_appointments += count
                }
                AppointmentStatus::CanceledByConsultant => {
                    stats.cancelled_by_consultant_appointments += count
                }
                AppointmentStatus::MissedByCustomer => stats.missed_by_customer_appointments += count,
                AppointmentStatus::MissedByConsultant => {
                    stats.missed_by_consultant_appointments += count
                }
                AppointmentStatus::Available => {}
            }
        }

        stats
    }
}
