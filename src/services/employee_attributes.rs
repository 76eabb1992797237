// src/services/employee_attributes.rs
//
// Derivações puras sobre as linhas já carregadas do banco.
// O EmployeeService busca os dados; aqui só ficam as regras.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::hr::{
        EffectivePermission, EmployeeNames, JobApplication, Permission, PermissionGrant,
        PermissionTag, Staffing, StatusMembership,
    },
};

/// A lotação aberta (end_date nulo), se houver.
/// Mais de uma aberta é violação de invariante e falha alto.
pub fn current_staffing(
    employee_id: Uuid,
    staffings: &[Staffing],
) -> Result<Option<&Staffing>, AppError> {
    let mut open = staffings.iter().filter(|s| s.is_open());
    let current = open.next();

    if open.next().is_some() {
        return Err(AppError::MultipleOpenStaffings(employee_id));
    }

    Ok(current)
}

/// Início da primeira lotação.
pub fn start_working_date(staffings: &[Staffing]) -> Option<NaiveDate> {
    staffings.iter().map(|s| s.start_date).min()
}

/// Entre as situações abertas, a de start_date mais recente.
/// Empate: vence a última da lista (os repositórios ordenam por start_date, created_at).
pub fn current_employment_status(memberships: &[StatusMembership]) -> Option<&StatusMembership> {
    memberships
        .iter()
        .filter(|m| m.end_date.is_none())
        .max_by_key(|m| m.start_date)
}

/// Exceções da lotação primeiro (granted / excluded), na ordem recebida;
/// depois as permissões padrão do cargo que ainda não apareceram, como default.
/// A comparação é pelo id da permissão.
pub fn effective_permissions(
    grants: &[PermissionGrant],
    defaults: &[Permission],
) -> Vec<EffectivePermission> {
    let mut seen: HashSet<Uuid> = HashSet::with_capacity(grants.len() + defaults.len());
    let mut permissions = Vec::with_capacity(grants.len() + defaults.len());

    for grant in grants {
        if seen.insert(grant.permission.id) {
            permissions.push(EffectivePermission {
                permission: grant.permission.clone(),
                tag: grant.status.into(),
            });
        }
    }

    for permission in defaults {
        if seen.insert(permission.id) {
            permissions.push(EffectivePermission {
                permission: permission.clone(),
                tag: PermissionTag::Default,
            });
        }
    }

    permissions
}

/// Funcionário -> candidatura -> dados pessoais. Qualquer elo ausente dá nomes vazios.
pub fn employee_names(application: Option<&JobApplication>) -> EmployeeNames {
    application
        .and_then(|app| app.personal_data.as_ref())
        .map(EmployeeNames::from)
        .unwrap_or_default()
}
