// src/services/customer_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, secrets},
    db::CustomerStore,
    models::{
        crm::{
            Customer, CustomerDetection, CustomerFilter, CustomerMissedAppointments,
            CustomerUpdate, NewCustomer, ReconciliationOutcome, ReconciliationPlan, SignUpPayload,
            WalkInPayload,
        },
        pagination::{Page, PageRequest},
    },
    services::verification_service::VerificationService,
};

// Tentativas de gerar um username livre antes de desistir
const MAX_USERNAME_ATTEMPTS: usize = 20;

/// Classifica o primeiro registro com o documento.
pub fn detect_customer(matches: &[Customer]) -> CustomerDetection {
    match matches.first() {
        None => CustomerDetection::Unknown,
        Some(c) if !c.is_using_app => CustomerDetection::WalkIn {
            customer_id: c.id,
            created_at: c.created_at.date_naive(),
        },
        Some(c) => CustomerDetection::AppUser {
            customer_id: c.id,
            created_at: c.created_at.date_naive(),
        },
    }
}

/// Decide o que fazer com a conta do app dado o que já existe com o mesmo documento.
pub fn plan_reconciliation(matches: &[Customer], app_account_id: Uuid) -> ReconciliationPlan {
    if matches.is_empty() {
        return ReconciliationPlan::Promote;
    }

    if let Some(walk_in) = matches.iter().find(|c| c.is_walk_in()) {
        // A "conta do app" já é o próprio registro de balcão
        if walk_in.id == app_account_id {
            return ReconciliationPlan::Reject { customer_id: walk_in.id };
        }
        return ReconciliationPlan::Merge { walk_in_id: walk_in.id };
    }

    ReconciliationPlan::Reject { customer_id: matches[0].id }
}

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
    verification: VerificationService,
    bcrypt_cost: u32,
}

impl CustomerService {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        verification: VerificationService,
        bcrypt_cost: u32,
    ) -> Self {
        Self { store, verification, bcrypt_cost }
    }

    // =========================================================================
    //  1. IDENTIDADE
    // =========================================================================

    pub async fn detect(&self, national_number: &str) -> Result<CustomerDetection, AppError> {
        let matches = self.store.find_by_national_number(national_number).await?;
        Ok(detect_customer(&matches))
    }

    /// Vincula o documento à conta do app: promove, absorve no cadastro de
    /// balcão ou recusa se já houver conta verificada.
    pub async fn verify_identity(
        &self,
        national_number: &str,
        app_account_id: Uuid,
    ) -> Result<ReconciliationOutcome, AppError> {
        let app_account = self
            .store
            .find_by_id(app_account_id)
            .await?
            .ok_or(AppError::CustomerNotFound(app_account_id))?;

        let matches = self.store.find_by_national_number(national_number).await?;

        match plan_reconciliation(&matches, app_account_id) {
            ReconciliationPlan::Reject { customer_id } => {
                tracing::warn!(
                    %app_account_id,
                    existing = %customer_id,
                    "Documento já vinculado a uma conta verificada"
                );
                Err(AppError::CustomerAlreadyVerified { customer_id })
            }
            _ if !app_account.is_using_app => Err(AppError::NotAnAppAccount(app_account_id)),
            ReconciliationPlan::Promote => {
                let customer = self
                    .store
                    .promote(app_account_id, national_number)
                    .await?
                    .ok_or(AppError::CustomerNotFound(app_account_id))?;

                tracing::info!(customer_id = %customer.id, "Conta do app verificada");
                Ok(ReconciliationOutcome::Promoted(customer))
            }
            ReconciliationPlan::Merge { walk_in_id } => {
                let customer = self.store.merge_into(app_account_id, walk_in_id).await?;
                Ok(ReconciliationOutcome::Merged(customer))
            }
        }
    }

    // =========================================================================
    //  2. CADASTRO
    // =========================================================================

    /// Cadastro pelo aplicativo. Com e-mail, já dispara o código de verificação.
    pub async fn sign_up(&self, payload: SignUpPayload) -> Result<Customer, AppError> {
        payload.validate()?;

        let password_hash = secrets::hash_password(&payload.password, self.bcrypt_cost).await?;

        let customer = self
            .store
            .insert(NewCustomer {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
                username: payload.username,
                password_hash,
                phone: payload.phone,
                phone_number: payload.phone_number,
                birth_date: payload.birth_date,
                job: payload.job,
                marital_status: payload.marital_status,
                num_of_children: payload.num_of_children,
                national_number: None,
                profile_picture: payload.profile_picture,
                verified: false,
                is_using_app: true,
            })
            .await?;

        // O cadastro já existe: falha no envio não desfaz nada, o código pode ser reenviado
        if let Some(email) = customer.email.as_deref() {
            if let Err(e) = self.verification.send_code(email).await {
                tracing::warn!(
                    customer_id = %customer.id,
                    error = %e,
                    "Falha ao enviar o código de verificação"
                );
            }
        }

        tracing::info!(customer_id = %customer.id, "Cliente cadastrado pelo aplicativo");

        Ok(customer)
    }

    /// Cadastro de balcão: username e senha gerados; verificado se trouxe documento.
    pub async fn register_walk_in(&self, payload: WalkInPayload) -> Result<Customer, AppError> {
        payload.validate()?;

        let username = self.free_username(&payload.first_name).await?;
        let password = secrets::generate_password();
        let password_hash = secrets::hash_password(&password, self.bcrypt_cost).await?;
        let verified = payload.national_number.is_some();

        let customer = self
            .store
            .insert(NewCustomer {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
                username,
                password_hash,
                phone: payload.phone,
                phone_number: payload.phone_number,
                birth_date: payload.birth_date,
                job: payload.job,
                marital_status: payload.marital_status,
                num_of_children: payload.num_of_children,
                national_number: payload.national_number,
                profile_picture: payload.profile_picture,
                verified,
                is_using_app: false,
            })
            .await?;

        tracing::info!(customer_id = %customer.id, verified, "Cliente de balcão cadastrado");

        Ok(customer)
    }

    // =========================================================================
    //  3. CONSULTA E MANUTENÇÃO
    // =========================================================================

    pub async fn get(&self, id: Uuid) -> Result<Customer, AppError> {
        self.store.find_by_id(id).await?.ok_or(AppError::CustomerNotFound(id))
    }

    pub async fn list(
        &self,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        self.store.list(filter, page).await
    }

    pub async fn list_with_missed_appointments(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CustomerMissedAppointments>, AppError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        self.store.list_with_missed_appointments(name, page).await
    }

    pub async fn update(&self, id: Uuid, changes: &CustomerUpdate) -> Result<Customer, AppError> {
        self.store.update(id, changes).await?.ok_or(AppError::CustomerNotFound(id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::CustomerNotFound(id));
        }
        tracing::info!(customer_id = %id, "Cliente removido");
        Ok(())
    }

    pub async fn toggle_blocked(&self, id: Uuid) -> Result<Customer, AppError> {
        self.store.toggle_blocked(id).await?.ok_or(AppError::CustomerNotFound(id))
    }

    // --- helpers ---

    async fn free_username(&self, first_name: &str) -> Result<String, AppError> {
        for _ in 0..MAX_USERNAME_ATTEMPTS {
            let candidate = secrets::candidate_username(first_name);
            if !self.store.username_exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(anyhow::anyhow!(
            "Nenhum username livre para '{}' após {} tentativas",
            first_name,
            MAX_USERNAME_ATTEMPTS
        )
        .into())
    }
}
