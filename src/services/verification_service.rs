// src/services/verification_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::{error::AppError, secrets},
    db::{CustomerStore, OtpStore},
    models::crm::Customer,
    services::notification::Mailer,
};

#[derive(Clone)]
pub struct VerificationService {
    otp_store: Arc<dyn OtpStore>,
    customers: Arc<dyn CustomerStore>,
    mailer: Arc<dyn Mailer>,
    validity_minutes: i32,
}

impl VerificationService {
    pub fn new(
        otp_store: Arc<dyn OtpStore>,
        customers: Arc<dyn CustomerStore>,
        mailer: Arc<dyn Mailer>,
        validity_minutes: i32,
    ) -> Self {
        Self { otp_store, customers, mailer, validity_minutes }
    }

    /// Gera um novo código de 6 dígitos (descartando os anteriores) e envia.
    pub async fn send_code(&self, identifier: &str) -> Result<(), AppError> {
        let token = secrets::generate_code();

        let code = self
            .otp_store
            .replace_code(identifier, &token, self.validity_minutes)
            .await?;

        self.mailer.send_verification_code(identifier, &token).await?;

        tracing::info!(
            identifier = %identifier,
            expires_at = %code.expires_at(),
            "Código de verificação enviado"
        );

        Ok(())
    }

    /// Confere o código e marca o e-mail do cliente como verificado.
    /// O código é consumido uma única vez; uma segunda tentativa é OtpMismatch.
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<Customer, AppError> {
        let customer = self
            .customers
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::CustomerEmailNotFound(email.to_string()))?;

        let code = match self.otp_store.find_code(email, token).await? {
            Some(code) if code.valid => code,
            _ => return Err(AppError::OtpMismatch),
        };

        let now = Utc::now();
        if code.is_expired_at(now) {
            self.otp_store.invalidate(code.id).await?;
            tracing::warn!(%email, "Código de verificação expirado");
            return Err(AppError::OtpExpired);
        }

        // Grava a verificação antes de consumir o código: se a gravação falhar,
        // o código continua válido e o cliente pode tentar de novo
        let customer = self
            .customers
            .mark_email_verified(customer.id, now)
            .await?
            .ok_or(AppError::CustomerNotFound(customer.id))?;

        // Duas validações simultâneas: só uma consegue consumir
        if !self.otp_store.invalidate(code.id).await? {
            return Err(AppError::OtpMismatch);
        }

        tracing::info!(customer_id = %customer.id, "E-mail verificado");

        Ok(customer)
    }

    pub async fn pending_identifiers(&self) -> Result<Vec<String>, AppError> {
        self.otp_store.pending_identifiers().await
    }
}
