// src/models/hr.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---
// 1. Funcionário
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub job_application_id: Option<Uuid>,
    pub leaves_balance: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Soft delete: registros com deleted_at não aparecem nas buscas
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobTitle {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

// ---
// 2. Lotação (Staffing)
// ---
// Um período contínuo do funcionário em um departamento + cargo.
// end_date = None significa lotação aberta (atual).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Staffing {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub department_id: Uuid,
    pub job_title_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staffing {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

// ---
// 3. Permissões efetivas
// ---

/// Status gravado em staff_permissions: 1 = concedida, 0 = excluída.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Granted,
    Excluded,
}

impl From<i16> for GrantStatus {
    fn from(status: i16) -> Self {
        if status == 0 {
            GrantStatus::Excluded
        } else {
            GrantStatus::Granted
        }
    }
}

impl GrantStatus {
    pub fn as_db(self) -> i16 {
        match self {
            GrantStatus::Granted => 1,
            GrantStatus::Excluded => 0,
        }
    }
}

/// Exceção de permissão em uma lotação específica.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PermissionGrant {
    #[sqlx(flatten)]
    pub permission: Permission,
    #[sqlx(try_from = "i16")]
    pub status: GrantStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionTag {
    Granted,
    Excluded,
    Default,
}

impl From<GrantStatus> for PermissionTag {
    fn from(status: GrantStatus) -> Self {
        match status {
            GrantStatus::Granted => PermissionTag::Granted,
            GrantStatus::Excluded => PermissionTag::Excluded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivePermission {
    #[serde(flatten)]
    pub permission: Permission,

    #[serde(rename = "type")]
    pub tag: PermissionTag,
}

// ---
// 4. Situação funcional (ativo, suspenso, ...)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentStatus {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Linha da tabela ponte employee_statuses, já com o status resolvido.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusMembership {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub status: EmploymentStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

// ---
// 5. Nome (Funcionário -> Candidatura -> Dados pessoais)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalData {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub personal_data: Option<PersonalData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeNames {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<&PersonalData> for EmployeeNames {
    fn from(data: &PersonalData) -> Self {
        Self {
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            full_name: format!("{} {}", data.first_name, data.last_name),
        }
    }
}

// ---
// 6. Visão consolidada
// ---
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub id: Uuid,
    #[serde(flatten)]
    pub names: EmployeeNames,
    pub current_department: Option<Department>,
    pub current_job_title: Option<JobTitle>,
    pub current_employment_status: Option<EmploymentStatus>,
    pub start_working_date: Option<NaiveDate>,
    pub permissions: Vec<EffectivePermission>,
}
