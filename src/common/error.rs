// src/common/error.rs

use thiserror::Error;
use uuid::Uuid;

/// Classificação dos erros usada por quem chama o núcleo
/// (nada aqui é re-tentado automaticamente).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionViolation,
    Conflict,
    ValidationMismatch,
    InvalidInput,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- NÃO ENCONTRADO ---
    #[error("Funcionário {0} não encontrado")]
    EmployeeNotFound(Uuid),

    #[error("Cliente {0} não encontrado")]
    CustomerNotFound(Uuid),

    #[error("Nenhum cliente com o e-mail '{0}'")]
    CustomerEmailNotFound(String),

    #[error("Agendamento {0} não encontrado")]
    AppointmentNotFound(Uuid),

    // --- PRÉ-CONDIÇÕES ---
    #[error("O funcionário {0} não possui lotação ativa")]
    NoOpenStaffing(Uuid),

    #[error("O funcionário {0} possui mais de uma lotação ativa")]
    MultipleOpenStaffings(Uuid),

    #[error("Data {date} anterior ao início da lotação atual ({current_start})")]
    InvalidAssignmentDate {
        date: chrono::NaiveDate,
        current_start: chrono::NaiveDate,
    },

    #[error("O cliente {0} não é uma conta de aplicativo")]
    NotAnAppAccount(Uuid),

    // --- CONFLITOS ---
    #[error("O cliente já possui uma conta de aplicativo verificada")]
    CustomerAlreadyVerified { customer_id: Uuid },

    #[error("Agendamento {0} não está disponível")]
    AppointmentUnavailable(Uuid),

    #[error("O cliente {0} ainda possui agendamentos")]
    CustomerHasAppointments(Uuid),

    #[error("{0}")]
    UniqueConstraintViolation(String),

    // --- OTP ---
    #[error("Código de verificação inválido")]
    OtpMismatch,

    #[error("Código de verificação expirado")]
    OtpExpired,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::EmployeeNotFound(_)
            | AppError::CustomerNotFound(_)
            | AppError::CustomerEmailNotFound(_)
            | AppError::AppointmentNotFound(_) => ErrorKind::NotFound,

            AppError::NoOpenStaffing(_)
            | AppError::MultipleOpenStaffings(_)
            | AppError::InvalidAssignmentDate { .. }
            | AppError::NotAnAppAccount(_) => ErrorKind::PreconditionViolation,

            AppError::CustomerAlreadyVerified { .. }
            | AppError::AppointmentUnavailable(_)
            | AppError::CustomerHasAppointments(_)
            | AppError::UniqueConstraintViolation(_) => ErrorKind::Conflict,

            AppError::OtpMismatch | AppError::OtpExpired => ErrorKind::ValidationMismatch,

            AppError::ValidationError(_) => ErrorKind::InvalidInput,

            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_) => ErrorKind::Internal,
        }
    }

    /// Converte violação de chave única em um erro mais amigável.
    pub(crate) fn from_unique_violation(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::UniqueConstraintViolation(message.into());
            }
        }
        e.into()
    }
}
