// src/db/employee_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::hr::{
        Department, Employee, GrantStatus, JobApplication, JobTitle, Permission, PermissionGrant,
        PersonalData, Staffing, StatusMembership,
    },
};

/// Acesso às tabelas de RH (funcionários, lotações, permissões, situação funcional).
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Ignora funcionários com soft delete.
    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, AppError>;

    /// Todas as lotações do funcionário, ordenadas por start_date, created_at.
    async fn list_staffings(&self, employee_id: Uuid) -> Result<Vec<Staffing>, AppError>;

    async fn find_department(&self, department_id: Uuid) -> Result<Option<Department>, AppError>;

    async fn find_job_title(&self, job_title_id: Uuid) -> Result<Option<JobTitle>, AppError>;

    /// Exceções da lotação, na ordem em que foram concedidas.
    async fn list_staffing_grants(&self, staffing_id: Uuid)
        -> Result<Vec<PermissionGrant>, AppError>;

    async fn list_job_title_permissions(&self, job_title_id: Uuid)
        -> Result<Vec<Permission>, AppError>;

    /// Ordenadas por start_date, created_at.
    async fn list_status_memberships(&self, employee_id: Uuid)
        -> Result<Vec<StatusMembership>, AppError>;

    async fn find_job_application(&self, employee_id: Uuid)
        -> Result<Option<JobApplication>, AppError>;

    /// Fecha a lotação aberta (end_date = start_date) e abre a nova, na mesma transação.
    async fn open_staffing(
        &self,
        employee_id: Uuid,
        department_id: Uuid,
        job_title_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Staffing, AppError>;

    async fn close_staffing(&self, staffing_id: Uuid, end_date: NaiveDate)
        -> Result<Option<Staffing>, AppError>;

    async fn upsert_staffing_grant(
        &self,
        staffing_id: Uuid,
        permission_id: Uuid,
        status: GrantStatus,
    ) -> Result<(), AppError>;

    async fn delete_staffing_grant(&self, staffing_id: Uuid, permission_id: Uuid)
        -> Result<bool, AppError>;

    async fn add_job_title_permission(&self, job_title_id: Uuid, permission_id: Uuid)
        -> Result<(), AppError>;

    async fn remove_job_title_permission(&self, job_title_id: Uuid, permission_id: Uuid)
        -> Result<bool, AppError>;

    /// Fecha as situações abertas e abre a nova, na mesma transação.
    async fn open_status_membership(
        &self,
        employee_id: Uuid,
        employment_status_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<StatusMembership, AppError>;
}

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeStore for EmployeeRepository {
    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }

    async fn list_staffings(&self, employee_id: Uuid) -> Result<Vec<Staffing>, AppError> {
        let staffings = sqlx::query_as::<_, Staffing>(
            r#"
            SELECT id, employee_id, department_id, job_title_id,
                   start_date, end_date, created_at, updated_at
            FROM staffings
            WHERE employee_id = $1
            ORDER BY start_date ASC, created_at ASC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(staffings)
    }

    async fn find_department(&self, department_id: Uuid) -> Result<Option<Department>, AppError> {
        let department = sqlx::query_as::<_, Department>(
            "SELECT id, name, description FROM departments WHERE id = $1",
        )
        .bind(department_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    async fn find_job_title(&self, job_title_id: Uuid) -> Result<Option<JobTitle>, AppError> {
        let job_title = sqlx::query_as::<_, JobTitle>(
            "SELECT id, name, description FROM job_titles WHERE id = $1",
        )
        .bind(job_title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job_title)
    }

    async fn list_staffing_grants(
        &self,
        staffing_id: Uuid,
    ) -> Result<Vec<PermissionGrant>, AppError> {
        let grants = sqlx::query_as::<_, PermissionGrant>(
            r#"
            SELECT p.id, p.name, p.description, sp.status
            FROM staff_permissions sp
            INNER JOIN permissions p ON p.id = sp.permission_id
            WHERE sp.staffing_id = $1
            ORDER BY sp.created_at ASC, p.name ASC
            "#,
        )
        .bind(staffing_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(grants)
    }

    async fn list_job_title_permissions(
        &self,
        job_title_id: Uuid,
    ) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.name, p.description
            FROM job_title_permissions jtp
            INNER JOIN permissions p ON p.id = jtp.permission_id
            WHERE jtp.job_title_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(job_title_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    async fn list_status_memberships(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<StatusMembership>, AppError> {
        let memberships = sqlx::query_as::<_, StatusMembership>(
            r#"
            SELECT es.id, es.name, es.description, ms.start_date, ms.end_date
            FROM employee_statuses ms
            INNER JOIN employment_statuses es ON es.id = ms.employment_status_id
            WHERE ms.employee_id = $1
            ORDER BY ms.start_date ASC, ms.created_at ASC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(memberships)
    }

    async fn find_job_application(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<JobApplication>, AppError> {
        // LEFT JOIN: a candidatura pode existir sem dados pessoais
        let row = sqlx::query_as::<_, (Uuid, Option<Uuid>, Option<String>, Option<String>)>(
            r#"
            SELECT ja.id, pd.id, pd.first_name, pd.last_name
            FROM employees e
            INNER JOIN job_applications ja ON ja.id = e.job_application_id
            LEFT JOIN personal_data pd ON pd.id = ja.personal_data_id
            WHERE e.id = $1 AND e.deleted_at IS NULL
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, data_id, first_name, last_name)| JobApplication {
            id,
            personal_data: match (data_id, first_name, last_name) {
                (Some(id), Some(first_name), Some(last_name)) => Some(PersonalData {
                    id,
                    first_name,
                    last_name,
                }),
                _ => None,
            },
        }))
    }

    async fn open_staffing(
        &self,
        employee_id: Uuid,
        department_id: Uuid,
        job_title_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Staffing, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Fecha a lotação atual (histórico é preservado, nunca apagado)
        let closed = sqlx::query(
            r#"
            UPDATE staffings
            SET end_date = $2, updated_at = NOW()
            WHERE employee_id = $1 AND end_date IS NULL
            "#,
        )
        .bind(employee_id)
        .bind(start_date)
        .execute(&mut *tx)
        .await?;

        // 2. Abre a nova. O índice parcial único barra duas lotações abertas.
        let staffing = sqlx::query_as::<_, Staffing>(
            r#"
            INSERT INTO staffings (employee_id, department_id, job_title_id, start_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, employee_id, department_id, job_title_id,
                      start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(employee_id)
        .bind(department_id)
        .bind(job_title_id)
        .bind(start_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(e, "O funcionário já possui uma lotação ativa.")
        })?;

        tx.commit().await?;

        tracing::info!(
            %employee_id,
            staffing_id = %staffing.id,
            closed = closed.rows_affected(),
            "🧑‍💼 Nova lotação registrada"
        );

        Ok(staffing)
    }

    async fn close_staffing(
        &self,
        staffing_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<Option<Staffing>, AppError> {
        let staffing = sqlx::query_as::<_, Staffing>(
            r#"
            UPDATE staffings
            SET end_date = $2, updated_at = NOW()
            WHERE id = $1 AND end_date IS NULL
            RETURNING id, employee_id, department_id, job_title_id,
                      start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(staffing_id)
        .bind(end_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(staffing)
    }

    async fn upsert_staffing_grant(
        &self,
        staffing_id: Uuid,
        permission_id: Uuid,
        status: GrantStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO staff_permissions (staffing_id, permission_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (staffing_id, permission_id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(staffing_id)
        .bind(permission_id)
        .bind(status.as_db())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_staffing_grant(
        &self,
        staffing_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM staff_permissions WHERE staffing_id = $1 AND permission_id = $2",
        )
        .bind(staffing_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_job_title_permission(
        &self,
        job_title_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO job_title_permissions (job_title_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(job_title_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_job_title_permission(
        &self,
        job_title_id: Uuid,
        permission_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM job_title_permissions WHERE job_title_id = $1 AND permission_id = $2",
        )
        .bind(job_title_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn open_status_membership(
        &self,
        employee_id: Uuid,
        employment_status_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<StatusMembership, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE employee_statuses
            SET end_date = GREATEST(start_date, $2)
            WHERE employee_id = $1 AND end_date IS NULL
            "#,
        )
        .bind(employee_id)
        .bind(start_date)
        .execute(&mut *tx)
        .await?;

        let membership = sqlx::query_as::<_, StatusMembership>(
            r#"
            WITH inserted AS (
                INSERT INTO employee_statuses (employee_id, employment_status_id, start_date)
                VALUES ($1, $2, $3)
                RETURNING employment_status_id, start_date, end_date
            )
            SELECT es.id, es.name, es.description, i.start_date, i.end_date
            FROM inserted i
            INNER JOIN employment_statuses es ON es.id = i.employment_status_id
            "#,
        )
        .bind(employee_id)
        .bind(employment_status_id)
        .bind(start_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(membership)
    }
}
