// src/services/appointment_service.rs
//
// Operações do próprio cliente. O caller_id vem da autenticação, que fica fora daqui.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AppointmentStore,
    models::appointment::{Appointment, AppointmentStatistics},
};

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Reserva um horário livre para o cliente.
    pub async fn book(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppError> {
        let appointment = self
            .store
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppError::AppointmentNotFound(appointment_id))?;

        if !appointment.is_bookable() {
            return Err(AppError::AppointmentUnavailable(appointment_id));
        }

        // O UPDATE é condicional: se outro cliente reservou antes, volta None
        let reserved = self
            .store
            .reserve(appointment_id, caller_id)
            .await?
            .ok_or(AppError::AppointmentUnavailable(appointment_id))?;

        tracing::info!(%appointment_id, customer_id = %caller_id, "Horário reservado");

        Ok(reserved)
    }

    pub async fn my_appointments(&self, caller_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        self.store.list_by_customer(caller_id).await
    }

    pub async fn my_statistics(&self, caller_id: Uuid) -> Result<AppointmentStatistics, AppError> {
        let counts = self.store.count_by_status(caller_id).await?;
        Ok(AppointmentStatistics::from_counts(&counts))
    }
}
