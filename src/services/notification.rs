// src/services/notification.rs

use async_trait::async_trait;

use crate::common::error::AppError;

/// Transporte dos códigos de verificação (e-mail, SMS...).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), AppError>;
}

/// Não envia nada: só registra no log. O código só aparece em nível debug.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        tracing::info!(%email, "Código de verificação emitido");
        tracing::debug!(%email, %code, "Conteúdo do código de verificação");
        Ok(())
    }
}
