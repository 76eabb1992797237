// src/models/crm.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// --- CLIENTE ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,

    pub first_name: String,
    pub last_name: String,

    pub email: Option<String>,
    pub username: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub job: Option<String>,
    pub marital_status: Option<String>,
    pub num_of_children: Option<i32>,

    // Documento nacional: identidade única depois de verificado
    pub national_number: Option<String>,
    pub profile_picture: Option<String>,

    pub verified: bool,
    pub is_using_app: bool,
    pub blocked: bool,
    pub email_verified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Cliente criado no balcão, sem conta no aplicativo.
    pub fn is_walk_in(&self) -> bool {
        self.verified && !self.is_using_app
    }
}

/// Dados já resolvidos (senha com hash, username gerado) prontos para o INSERT.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub username: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub job: Option<String>,
    pub marital_status: Option<String>,
    pub num_of_children: Option<i32>,
    pub national_number: Option<String>,
    pub profile_picture: Option<String>,
    pub verified: bool,
    pub is_using_app: bool,
}

// --- PAYLOADS ---

// Cadastro feito pelo próprio cliente no aplicativo
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "O sobrenome é obrigatório."))]
    pub last_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "O usuário deve ter no mínimo 3 caracteres."))]
    pub username: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub job: Option<String>,
    pub marital_status: Option<String>,
    #[validate(range(min = 0, message = "Número de filhos inválido."))]
    pub num_of_children: Option<i32>,
    pub profile_picture: Option<String>,
}

// Cadastro feito por um funcionário (cliente de balcão)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WalkInPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "O sobrenome é obrigatório."))]
    pub last_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub job: Option<String>,
    pub marital_status: Option<String>,
    #[validate(range(min = 0, message = "Número de filhos inválido."))]
    pub num_of_children: Option<i32>,
    #[validate(length(min = 1, message = "Documento inválido."))]
    pub national_number: Option<String>,
    pub profile_picture: Option<String>,
}

/// Atualização parcial: None mantém o valor atual.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub job: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub marital_status: Option<String>,
    pub num_of_children: Option<i32>,
    pub national_number: Option<String>,
    pub profile_picture: Option<String>,
    pub verified: Option<bool>,
    pub blocked: Option<bool>,
}

// --- FILTROS DA LISTAGEM ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    /// Busca em nome, sobrenome ou nome completo (sem diferenciar maiúsculas)
    pub name: Option<String>,
    pub using_app: Option<bool>,
    pub username: Option<String>,
    pub job: Option<String>,
    pub marital_status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub from_birth_date: Option<NaiveDate>,
    pub to_birth_date: Option<NaiveDate>,
    pub num_of_children: Option<i32>,
    pub national_number: Option<String>,
    pub verified: Option<bool>,
    pub blocked: Option<bool>,
}

impl CustomerFilter {
    /// Termo de busca normalizado (trim + minúsculas); vazio conta como ausente.
    pub fn name_term(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMissedAppointments {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub missed_appointment_count: i64,
}

// --- IDENTIDADE / RECONCILIAÇÃO ---

/// Resultado da busca por documento nacional.
/// Os códigos 1/2/3 são os mesmos usados pelos clientes antigos da API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CustomerDetection {
    Unknown,
    #[serde(rename_all = "camelCase")]
    WalkIn { customer_id: Uuid, created_at: NaiveDate },
    #[serde(rename_all = "camelCase")]
    AppUser { customer_id: Uuid, created_at: NaiveDate },
}

impl CustomerDetection {
    pub fn code(&self) -> u8 {
        match self {
            CustomerDetection::Unknown => 1,
            CustomerDetection::WalkIn { .. } => 2,
            CustomerDetection::AppUser { .. } => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationPlan {
    /// Nenhum registro com o documento: a conta do app vira a verificada
    Promote,
    /// Existe cliente de balcão verificado: a conta do app é absorvida por ele
    Merge { walk_in_id: Uuid },
    /// Já existe conta de app verificada para o documento
    Reject { customer_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "customer", rename_all = "camelCase")]
pub enum ReconciliationOutcome {
    Promoted(Customer),
    Merged(Customer),
}

impl ReconciliationOutcome {
    pub fn customer(&self) -> &Customer {
        match self {
            ReconciliationOutcome::Promoted(c) | ReconciliationOutcome::Merged(c) => c,
        }
    }
}
