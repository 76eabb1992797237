// src/services/employee_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::EmployeeStore,
    models::hr::{
        Department, EffectivePermission, Employee, EmployeeNames, EmployeeProfile,
        EmploymentStatus, GrantStatus, JobTitle, Staffing, StatusMembership,
    },
    services::employee_attributes,
};

#[derive(Clone)]
pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
}

impl EmployeeService {
    pub fn new(store: Arc<dyn EmployeeStore>) -> Self {
        Self { store }
    }

    // =========================================================================
    //  ATRIBUTOS DERIVADOS
    // =========================================================================

    pub async fn current_department(&self, employee_id: Uuid) -> Result<Option<Department>, AppError> {
        match self.open_staffing(employee_id).await? {
            Some(staffing) => self.store.find_department(staffing.department_id).await,
            None => Ok(None),
        }
    }

    pub async fn current_job_title(&self, employee_id: Uuid) -> Result<Option<JobTitle>, AppError> {
        match self.open_staffing(employee_id).await? {
            Some(staffing) => self.store.find_job_title(staffing.job_title_id).await,
            None => Ok(None),
        }
    }

    pub async fn start_working_date(&self, employee_id: Uuid) -> Result<Option<NaiveDate>, AppError> {
        self.ensure_exists(employee_id).await?;
        let staffings = self.store.list_staffings(employee_id).await?;

        Ok(employee_attributes::start_working_date(&staffings))
    }

    pub async fn current_employment_status(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<EmploymentStatus>, AppError> {
        self.ensure_exists(employee_id).await?;
        let memberships = self.store.list_status_memberships(employee_id).await?;

        Ok(employee_attributes::current_employment_status(&memberships).map(|m| m.status.clone()))
    }

    /// Falha com NoOpenStaffing se o funcionário não estiver lotado.
    pub async fn effective_permissions(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<EffectivePermission>, AppError> {
        let staffing = self.require_open_staffing(employee_id).await?;
        self.permissions_for(&staffing).await
    }

    pub async fn names(&self, employee_id: Uuid) -> Result<EmployeeNames, AppError> {
        self.ensure_exists(employee_id).await?;
        let application = self.store.find_job_application(employee_id).await?;

        Ok(employee_attributes::employee_names(application.as_ref()))
    }

    /// Tudo de uma vez. Sem lotação aberta, a lista de permissões vem vazia.
    pub async fn profile(&self, employee_id: Uuid) -> Result<EmployeeProfile, AppError> {
        self.ensure_exists(employee_id).await?;

        let staffings = self.store.list_staffings(employee_id).await?;
        let current = employee_attributes::current_staffing(employee_id, &staffings)?;

        let (current_department, current_job_title, permissions) = match current {
            Some(staffing) => (
                self.store.find_department(staffing.department_id).await?,
                self.store.find_job_title(staffing.job_title_id).await?,
                self.permissions_for(staffing).await?,
            ),
            None => (None, None, Vec::new()),
        };

        let memberships = self.store.list_status_memberships(employee_id).await?;
        let application = self.store.find_job_application(employee_id).await?;

        Ok(EmployeeProfile {
            id: employee_id,
            names: employee_attributes::employee_names(application.as_ref()),
            current_department,
            current_job_title,
            current_employment_status: employee_attributes::current_employment_status(&memberships)
                .map(|m| m.status.clone()),
            start_working_date: employee_attributes::start_working_date(&staffings),
            permissions,
        })
    }

    // =========================================================================
    //  LOTAÇÃO E PERMISSÕES
    // =========================================================================

    /// Fecha a lotação atual na data de início da nova e abre a nova.
    pub async fn assign_staffing(
        &self,
        employee_id: Uuid,
        department_id: Uuid,
        job_title_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Staffing, AppError> {
        if let Some(current) = self.open_staffing(employee_id).await? {
            if start_date < current.start_date {
                return Err(AppError::InvalidAssignmentDate {
                    date: start_date,
                    current_start: current.start_date,
                });
            }
        }

        self.store
            .open_staffing(employee_id, department_id, job_title_id, start_date)
            .await
    }

    pub async fn end_current_staffing(
        &self,
        employee_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<Staffing, AppError> {
        let current = self.require_open_staffing(employee_id).await?;

        if end_date < current.start_date {
            return Err(AppError::InvalidAssignmentDate {
                date: end_date,
                current_start: current.start_date,
            });
        }

        let closed = self
            .store
            .close_staffing(current.id, end_date)
            .await?
            // Alguém fechou entre a leitura e o UPDATE
            .ok_or(AppError::NoOpenStaffing(employee_id))?;

        tracing::info!(%employee_id, staffing_id = %closed.id, %end_date, "Lotação encerrada");

        Ok(closed)
    }

    pub async fn grant_permission(&self, employee_id: Uuid, permission_id: Uuid) -> Result<(), AppError> {
        self.set_override(employee_id, permission_id, GrantStatus::Granted).await
    }

    pub async fn exclude_permission(&self, employee_id: Uuid, permission_id: Uuid) -> Result<(), AppError> {
        self.set_override(employee_id, permission_id, GrantStatus::Excluded).await
    }

    /// Remove a exceção; a permissão volta a seguir o padrão do cargo.
    pub async fn clear_permission_override(
        &self,
        employee_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, AppError> {
        let staffing = self.require_open_staffing(employee_id).await?;
        self.store.delete_staffing_grant(staffing.id, permission_id).await
    }

    pub async fn add_job_title_permission(
        &self,
        job_title_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), AppError> {
        self.store.add_job_title_permission(job_title_id, permission_id).await
    }

    pub async fn remove_job_title_permission(
        &self,
        job_title_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, AppError> {
        self.store.remove_job_title_permission(job_title_id, permission_id).await
    }

    pub async fn change_employment_status(
        &self,
        employee_id: Uuid,
        employment_status_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<StatusMembership, AppError> {
        self.ensure_exists(employee_id).await?;

        let membership = self
            .store
            .open_status_membership(employee_id, employment_status_id, start_date)
            .await?;

        tracing::info!(%employee_id, status = %membership.status.name, "Situação funcional alterada");

        Ok(membership)
    }

    // --- helpers ---

    async fn ensure_exists(&self, employee_id: Uuid) -> Result<Employee, AppError> {
        self.store
            .find_employee(employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound(employee_id))
    }

    async fn open_staffing(&self, employee_id: Uuid) -> Result<Option<Staffing>, AppError> {
        self.ensure_exists(employee_id).await?;
        let staffings = self.store.list_staffings(employee_id).await?;

        Ok(employee_attributes::current_staffing(employee_id, &staffings)?.cloned())
    }

    async fn require_open_staffing(&self, employee_id: Uuid) -> Result<Staffing, AppError> {
        self.open_staffing(employee_id)
            .await?
            .ok_or(AppError::NoOpenStaffing(employee_id))
    }

    async fn permissions_for(&self, staffing: &Staffing) -> Result<Vec<EffectivePermission>, AppError> {
        let grants = self.store.list_staffing_grants(staffing.id).await?;
        let defaults = self.store.list_job_title_permissions(staffing.job_title_id).await?;

        Ok(employee_attributes::effective_permissions(&grants, &defaults))
    }

    async fn set_override(
        &self,
        employee_id: Uuid,
        permission_id: Uuid,
        status: GrantStatus,
    ) -> Result<(), AppError> {
        let staffing = self.require_open_staffing(employee_id).await?;
        self.store.upsert_staffing_grant(staffing.id, permission_id, status).await
    }
}
