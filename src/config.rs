// src/config.rs

use std::{collections::HashMap, env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{AppointmentRepository, CustomerRepository, EmployeeRepository, OtpRepository},
    services::{
        appointment_service::AppointmentService, customer_service::CustomerService,
        employee_service::EmployeeService, notification::LogMailer,
        verification_service::VerificationService,
    },
};

/// Configuração lida do ambiente (e do .env, se existir).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub otp_validity_minutes: i32,
    pub bcrypt_cost: u32,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        let database_url = vars
            .get("DATABASE_URL")
            .cloned()
            .context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            db_max_connections: parse_or(vars, "DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or(vars, "DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            otp_validity_minutes: parse_or(vars, "OTP_VALIDITY_MINUTES", 10)?,
            bcrypt_cost: parse_or(vars, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub employee_service: EmployeeService,
    pub customer_service: CustomerService,
    pub appointment_service: AppointmentService,
    pub verification_service: VerificationService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;
        Self::from_settings(&settings).await
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(settings.db_acquire_timeout)
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let customer_repo = Arc::new(CustomerRepository::new(db_pool.clone()));

        let verification_service = VerificationService::new(
            Arc::new(OtpRepository::new(db_pool.clone())),
            customer_repo.clone(),
            Arc::new(LogMailer),
            settings.otp_validity_minutes,
        );
        let customer_service = CustomerService::new(
            customer_repo,
            verification_service.clone(),
            settings.bcrypt_cost,
        );
        let employee_service =
            EmployeeService::new(Arc::new(EmployeeRepository::new(db_pool.clone())));
        let appointment_service =
            AppointmentService::new(Arc::new(AppointmentRepository::new(db_pool.clone())));

        Ok(Self {
            db_pool,
            employee_service,
            customer_service,
            appointment_service,
            verification_service,
        })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!()
            .run(&self.db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
        Ok(())
    }
}
