// src/db/customer_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        crm::{Customer, CustomerFilter, CustomerMissedAppointments, CustomerUpdate, NewCustomer},
        pagination::{Page, PageRequest},
    },
};

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, AppError>;

    /// Primeiro cadastro com o e-mail (mais antigo).
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, AppError>;

    async fn find_by_national_number(&self, national_number: &str)
        -> Result<Vec<Customer>, AppError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AppError>;

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, AppError>;

    async fn list(&self, filter: &CustomerFilter, page: PageRequest)
        -> Result<Page<Customer>, AppError>;

    /// Clientes com faltas, do que mais faltou para o que menos faltou.
    async fn list_with_missed_appointments(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CustomerMissedAppointments>, AppError>;

    async fn update(&self, id: Uuid, changes: &CustomerUpdate) -> Result<Option<Customer>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn toggle_blocked(&self, id: Uuid) -> Result<Option<Customer>, AppError>;

    /// Anexa o documento e marca como verificado.
    async fn promote(&self, id: Uuid, national_number: &str) -> Result<Option<Customer>, AppError>;

    /// Absorve a conta do app no cadastro de balcão, tudo ou nada:
    /// move os agendamentos, apaga a conta do app e copia as credenciais.
    /// Se o cadastro de balcão já usa o aplicativo, CustomerAlreadyVerified e nada muda.
    async fn merge_into(&self, app_account_id: Uuid, walk_in_id: Uuid)
        -> Result<Customer, AppError>;

    async fn mark_email_verified(&self, id: Uuid, at: DateTime<Utc>)
        -> Result<Option<Customer>, AppError>;
}

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =========================================================================
//  FILTROS (QueryBuilder)
// =========================================================================

/// `%termo%` com os curingas do LIKE escapados: o termo é sempre literal.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_name_filter(qb: &mut QueryBuilder<'_, Postgres>, term: String, prefix: &str) {
    let pattern = like_pattern(&term);
    qb.push(format!(" AND (LOWER({p}first_name) LIKE ", p = prefix))
        .push_bind(pattern.clone())
        .push(format!(" ESCAPE '\\' OR LOWER({p}last_name) LIKE ", p = prefix))
        .push_bind(pattern.clone())
        .push(format!(
            " ESCAPE '\\' OR LOWER({p}first_name || ' ' || {p}last_name) LIKE ",
            p = prefix
        ))
        .push_bind(pattern)
        .push(" ESCAPE '\\')");
}

fn push_customer_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    if let Some(term) = filter.name_term() {
        push_name_filter(qb, term, "");
    }
    if let Some(using_app) = filter.using_app {
        qb.push(" AND is_using_app = ").push_bind(using_app);
    }
    if let Some(username) = &filter.username {
        qb.push(" AND username ILIKE ")
            .push_bind(like_pattern(username))
            .push(" ESCAPE '\\'");
    }
    if let Some(job) = &filter.job {
        qb.push(" AND job ILIKE ")
            .push_bind(like_pattern(job))
            .push(" ESCAPE '\\'");
    }
    if let Some(marital_status) = &filter.marital_status {
        qb.push(" AND marital_status = ").push_bind(marital_status.clone());
    }
    if let Some(birth_date) = filter.birth_date {
        qb.push(" AND birth_date = ").push_bind(birth_date);
    }
    if let Some(from) = filter.from_birth_date {
        qb.push(" AND birth_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to_birth_date {
        qb.push(" AND birth_date <= ").push_bind(to);
    }
    if let Some(children) = filter.num_of_children {
        qb.push(" AND num_of_children = ").push_bind(children);
    }
    if let Some(national_number) = &filter.national_number {
        qb.push(" AND national_number = ").push_bind(national_number.clone());
    }
    if let Some(verified) = filter.verified {
        qb.push(" AND verified = ").push_bind(verified);
    }
    if let Some(blocked) = filter.blocked {
        qb.push(" AND blocked = ").push_bind(blocked);
    }
}

const MISSED_STATUSES_SQL: &str = "('missed_by_customer', 'missed_by_consultant')";

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE email = $1 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_by_national_number(
        &self,
        national_number: &str,
    ) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE national_number = $1 ORDER BY created_at ASC",
        )
        .bind(national_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, AppError> {
        let username = customer.username.clone();

        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                first_name, last_name, email, username, password_hash,
                phone, phone_number, birth_date, job, marital_status,
                num_of_children, national_number, profile_picture,
                verified, is_using_app
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(customer.first_name)
        .bind(customer.last_name)
        .bind(customer.email)
        .bind(customer.username)
        .bind(customer.password_hash)
        .bind(customer.phone)
        .bind(customer.phone_number)
        .bind(customer.birth_date)
        .bind(customer.job)
        .bind(customer.marital_status)
        .bind(customer.num_of_children)
        .bind(customer.national_number)
        .bind(customer.profile_picture)
        .bind(customer.verified)
        .bind(customer.is_using_app)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                format!("O usuário '{}' ou o documento já está cadastrado.", username),
            )
        })
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        page: PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM customers WHERE TRUE");
        push_customer_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb.build_query_as::<Customer>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_customer_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn list_with_missed_appointments(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CustomerMissedAppointments>, AppError> {
        let term = name.map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty());

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT c.*, COUNT(a.id) AS missed_appointment_count
            FROM customers c
            INNER JOIN appointments a ON a.customer_id = c.id
            WHERE a.status IN {}
            "#,
            MISSED_STATUSES_SQL
        ));
        if let Some(term) = term.clone() {
            push_name_filter(&mut qb, term, "c.");
        }
        qb.push(" GROUP BY c.id ORDER BY missed_appointment_count DESC, c.last_name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = qb
            .build_query_as::<CustomerMissedAppointments>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT COUNT(DISTINCT c.id)
            FROM customers c
            INNER JOIN appointments a ON a.customer_id = c.id
            WHERE a.status IN {}
            "#,
            MISSED_STATUSES_SQL
        ));
        if let Some(term) = term {
            push_name_filter(&mut count, term, "c.");
        }
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &CustomerUpdate,
    ) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                job = COALESCE($5, job),
                birth_date = COALESCE($6, birth_date),
                phone = COALESCE($7, phone),
                phone_number = COALESCE($8, phone_number),
                marital_status = COALESCE($9, marital_status),
                num_of_children = COALESCE($10, num_of_children),
                national_number = COALESCE($11, national_number),
                profile_picture = COALESCE($12, profile_picture),
                verified = COALESCE($13, verified),
                blocked = COALESCE($14, blocked),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.job)
        .bind(changes.birth_date)
        .bind(&changes.phone)
        .bind(&changes.phone_number)
        .bind(&changes.marital_status)
        .bind(changes.num_of_children)
        .bind(&changes.national_number)
        .bind(&changes.profile_picture)
        .bind(changes.verified)
        .bind(changes.blocked)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(e, "Documento já pertence a outro cliente verificado.")
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::CustomerHasAppointments(id);
                    }
                }
                e.into()
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_blocked(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "UPDATE customers SET blocked = NOT blocked, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn promote(&self, id: Uuid, national_number: &str) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET national_number = $2, verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(national_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(e, "Documento já pertence a outro cliente verificado.")
        })
    }

    async fn merge_into(&self, app_account_id: Uuid, walk_in_id: Uuid) -> Result<Customer, AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        // Qualquer '?' abaixo desfaz tudo (rollback no drop do tx)
        let mut tx = self.pool.begin().await?;

        let app_account = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 FOR UPDATE",
        )
        .bind(app_account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::CustomerNotFound(app_account_id))?;

        // O cadastro de balcão também fica travado: outra incorporação concorrente
        // espera aqui e depois encontra is_using_app = TRUE
        let walk_in = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 FOR UPDATE",
        )
        .bind(walk_in_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::CustomerNotFound(walk_in_id))?;

        if !walk_in.is_walk_in() {
            return Err(AppError::CustomerAlreadyVerified { customer_id: walk_in_id });
        }

        // 1. Move os agendamentos para o cadastro de balcão
        let moved = sqlx::query(
            r#"
            UPDATE appointments
            SET customer_id = $1, updated_at = NOW()
            WHERE customer_id = $2
            "#,
        )
        .bind(walk_in_id)
        .bind(app_account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // 2. Apaga a conta do app (libera o username antes da cópia)
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(app_account_id)
            .execute(&mut *tx)
            .await?;

        // 3. Copia as credenciais para o cadastro verificado
        let merged = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET is_using_app = TRUE,
                email = $2,
                username = $3,
                password_hash = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(walk_in_id)
        .bind(&app_account.email)
        .bind(&app_account.username)
        .bind(&app_account.password_hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::CustomerNotFound(walk_in_id))?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(
            %app_account_id,
            %walk_in_id,
            moved_appointments = moved,
            "🔗 Conta do aplicativo incorporada ao cadastro verificado"
        );

        Ok(merged)
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "UPDATE customers SET email_verified_at = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }
}
