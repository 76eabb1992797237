// src/testing.rs
//
// Implementações em memória dos stores, com a mesma semântica das queries
// dos repositórios. Usadas só nos testes dos serviços.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AppointmentStore, CustomerStore, EmployeeStore, OtpStore},
    models::{
        appointment::{Appointment, AppointmentStatus},
        crm::{Customer, CustomerFilter, CustomerMissedAppointments, CustomerUpdate, NewCustomer},
        hr::{
            Department, Employee, EmploymentStatus, GrantStatus, JobApplication, JobTitle,
            Permission, PermissionGrant, PersonalData, Staffing, StatusMembership,
        },
        pagination::{Page, PageRequest},
        verification::OneTimeCode,
    },
    services::notification::Mailer,
};

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page::new(items, total, page)
}

// =========================================================================
//  RH
// =========================================================================

#[derive(Default)]
struct EmployeeState {
    employees: Vec<Employee>,
    applications: HashMap<Uuid, JobApplication>,
    departments: Vec<Department>,
    job_titles: Vec<JobTitle>,
    permissions: Vec<Permission>,
    statuses: Vec<EmploymentStatus>,
    staffings: Vec<Staffing>,
    grants: Vec<(Uuid, Uuid, GrantStatus)>,
    job_title_permissions: Vec<(Uuid, Uuid)>,
    memberships: Vec<(Uuid, StatusMembership)>,
}

#[derive(Default)]
pub struct MemoryEmployeeStore {
    state: Mutex<EmployeeState>,
}

impl MemoryEmployeeStore {
    fn state(&self) -> MutexGuard<'_, EmployeeState> {
        self.state.lock().unwrap()
    }

    pub fn add_employee(&self) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.state().employees.push(Employee {
            id,
            user_id: None,
            job_application_id: None,
            leaves_balance: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        id
    }

    pub fn add_employee_named(&self, first_name: &str, last_name: &str) -> Uuid {
        let id = self.add_employee();
        let application = JobApplication {
            id: Uuid::new_v4(),
            personal_data: Some(PersonalData {
                id: Uuid::new_v4(),
                first_name: first_name.into(),
                last_name: last_name.into(),
            }),
        };

        let mut state = self.state();
        if let Some(employee) = state.employees.iter_mut().find(|e| e.id == id) {
            employee.job_application_id = Some(application.id);
        }
        state.applications.insert(id, application);
        id
    }

    pub fn add_department(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().departments.push(Department { id, name: name.into(), description: None });
        id
    }

    pub fn add_job_title(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().job_titles.push(JobTitle { id, name: name.into(), description: None });
        id
    }

    pub fn add_permission(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().permissions.push(Permission { id, name: name.into(), description: None });
        id
    }

    pub fn add_employment_status(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state().statuses.push(EmploymentStatus { id, name: name.into(), description: None });
        id
    }

    pub fn staffings_of(&self, employee_id: Uuid) -> Vec<Staffing> {
        let mut staffings: Vec<Staffing> = self
            .state()
            .staffings
            .iter()
            .filter(|s| s.employee_id == employee_id)
            .cloned()
            .collect();
        staffings.sort_by_key(|s| (s.start_date, s.created_at));
        staffings
    }
}

#[async_trait]
impl EmployeeStore for MemoryEmployeeStore {
    async fn find_employee(&self, employee_id: Uuid) -> Result<Option<Employee>, AppError> {
        Ok(self
            .state()
            .employees
            .iter()
            .find(|e| e.id == employee_id && e.deleted_at.is_none())
            .cloned())
    }

    async fn list_staffings(&self, employee_id: Uuid) -> Result<Vec<Staffing>, AppError> {
        Ok(self.staffings_of(employee_id))
    }

    async fn find_department(&self, department_id: Uuid) -> Result<Option<Department>, AppError> {
        Ok(self.state().departments.iter().find(|d| d.id == department_id).cloned())
    }

    async fn find_job_title(&self, job_title_id: Uuid) -> Result<Option<JobTitle>, AppError> {
        Ok(self.state().job_titles.iter().find(|t| t.id == job_title_id).cloned())
    }

    async fn list_staffing_grants(&self, staffing_id: Uuid) -> Result<Vec<PermissionGrant>, AppError> {
        let state = self.state();
        Ok(state
            .grants
            .iter()
            .filter(|(s, _, _)| *s == staffing_id)
            .filter_map(|(_, p, status)| {
                state
                    .permissions
                    .iter()
                    .find(|perm| perm.id == *p)
                    .map(|perm| PermissionGrant { permission: perm.clone(), status: *status })
            })
            .collect())
    }

    async fn list_job_title_permissions(&self, job_title_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let state = self.state();
        Ok(state
            .job_title_permissions
            .iter()
            .filter(|(t, _)| *t == job_title_id)
            .filter_map(|(_, p)| state.permissions.iter().find(|perm| perm.id == *p).cloned())
            .collect())
    }

    async fn list_status_memberships(&self, employee_id: Uuid) -> Result<Vec<StatusMembership>, AppError> {
        let mut memberships: Vec<StatusMembership> = self
            .state()
            .memberships
            .iter()
            .filter(|(e, _)| *e == employee_id)
            .map(|(_, m)| m.clone())
            .collect();
        memberships.sort_by_key(|m| m.start_date);
        Ok(memberships)
    }

    async fn find_job_application(&self, employee_id: Uuid) -> Result<Option<JobApplication>, AppError> {
        Ok(self.state().applications.get(&employee_id).cloned())
    }

    async fn open_staffing(
        &self,
        employee_id: Uuid,
        department_id: Uuid,
        job_title_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Staffing, AppError> {
        let now = Utc::now();
        let mut state = self.state();

        for staffing in state
            .staffings
            .iter_mut()
            .filter(|s| s.employee_id == employee_id && s.is_open())
        {
            staffing.end_date = Some(start_date);
            staffing.updated_at = now;
        }

        let staffing = Staffing {
            id: Uuid::new_v4(),
            employee_id,
            department_id,
            job_title_id,
            start_date,
            end_date: None,
            created_at: now,
            updated_at: now,
        };
        state.staffings.push(staffing.clone());
        Ok(staffing)
    }

    async fn close_staffing(&self, staffing_id: Uuid, end_date: NaiveDate) -> Result<Option<Staffing>, AppError> {
        let mut state = self.state();
        let Some(staffing) = state
            .staffings
            .iter_mut()
            .find(|s| s.id == staffing_id && s.is_open())
        else {
            return Ok(None);
        };

        staffing.end_date = Some(end_date);
        staffing.updated_at = Utc::now();
        Ok(Some(staffing.clone()))
    }

    async fn upsert_staffing_grant(
        &self,
        staffing_id: Uuid,
        permission_id: Uuid,
        status: GrantStatus,
    ) -> Result<(), AppError> {
        let mut state = self.state();
        match state
            .grants
            .iter()
            .position(|(s, p, _)| *s == staffing_id && *p == permission_id)
        {
            Some(index) => state.grants[index].2 = status,
            None => state.grants.push((staffing_id, permission_id, status)),
        }
        Ok(())
    }

    async fn delete_staffing_grant(&self, staffing_id: Uuid, permission_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        let before = state.grants.len();
        state.grants.retain(|(s, p, _)| !(*s == staffing_id && *p == permission_id));
        Ok(state.grants.len() < before)
    }

    async fn add_job_title_permission(&self, job_title_id: Uuid, permission_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state();
        if !state.job_title_permissions.contains(&(job_title_id, permission_id)) {
            state.job_title_permissions.push((job_title_id, permission_id));
        }
        Ok(())
    }

    async fn remove_job_title_permission(&self, job_title_id: Uuid, permission_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        let before = state.job_title_permissions.len();
        state.job_title_permissions.retain(|pair| *pair != (job_title_id, permission_id));
        Ok(state.job_title_permissions.len() < before)
    }

    async fn open_status_membership(
        &self,
        employee_id: Uuid,
        employment_status_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<StatusMembership, AppError> {
        let mut state = self.state();

        let status = state
            .statuses
            .iter()
            .find(|s| s.id == employment_status_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("situação {} inexistente", employment_status_id))?;

        for (_, membership) in state
            .memberships
            .iter_mut()
            .filter(|(e, m)| *e == employee_id && m.end_date.is_none())
        {
            membership.end_date = Some(membership.start_date.max(start_date));
        }

        let membership = StatusMembership { status, start_date, end_date: None };
        state.memberships.push((employee_id, membership.clone()));
        Ok(membership)
    }
}

// =========================================================================
//  CLIENTES E AGENDAMENTOS
// =========================================================================

#[derive(Default)]
struct CustomerState {
    customers: Vec<Customer>,
    appointments: Vec<Appointment>,
}

/// Clientes e agendamentos no mesmo estado, como as duas tabelas no banco:
/// a incorporação de contas mexe nas duas de uma vez.
#[derive(Default)]
pub struct MemoryCustomerStore {
    state: Mutex<CustomerState>,
    fail_email_stamps: AtomicBool,
}

impl MemoryCustomerStore {
    fn state(&self) -> MutexGuard<'_, CustomerState> {
        self.state.lock().unwrap()
    }

    pub fn seed(&self, customer: Customer) -> Customer {
        self.state().customers.push(customer.clone());
        customer
    }

    pub fn seed_with_email(&self, first_name: &str, email: &str) -> Customer {
        let mut customer = crate::models::crm::tests::customer(first_name, "Teste");
        customer.email = Some(email.into());
        customer.is_using_app = true;
        self.seed(customer)
    }

    pub fn seed_appointment(&self, customer_id: Option<Uuid>, status: AppointmentStatus) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.state().appointments.push(Appointment {
            id,
            customer_id,
            status,
            start_time: now + Duration::days(1),
            end_time: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn appointment_owner(&self, appointment_id: Uuid) -> Option<Uuid> {
        self.state()
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .and_then(|a| a.customer_id)
    }

    pub fn customer_count(&self) -> usize {
        self.state().customers.len()
    }

    /// Enquanto ligado, mark_email_verified falha como se o banco caísse.
    pub fn fail_email_stamps(&self, fail: bool) {
        self.fail_email_stamps.store(fail, Ordering::SeqCst);
    }
}

/// Espelho de push_customer_filters: LIKE com termo literal, sem diferenciar maiúsculas.
fn filter_matches(filter: &CustomerFilter, customer: &Customer) -> bool {
    fn contains(field: &str, term: &Option<String>) -> bool {
        term.as_deref()
            .is_none_or(|t| field.to_lowercase().contains(&t.to_lowercase()))
    }
    fn equals(field: Option<&str>, term: &Option<String>) -> bool {
        term.as_deref().is_none_or(|t| field == Some(t))
    }

    if let Some(term) = filter.name_term() {
        let first = customer.first_name.to_lowercase();
        let last = customer.last_name.to_lowercase();
        let full = format!("{} {}", first, last);
        if !(first.contains(&term) || last.contains(&term) || full.contains(&term)) {
            return false;
        }
    }

    filter.using_app.is_none_or(|v| customer.is_using_app == v)
        && contains(&customer.username, &filter.username)
        && contains(customer.job.as_deref().unwrap_or(""), &filter.job)
        && equals(customer.marital_status.as_deref(), &filter.marital_status)
        && filter.birth_date.is_none_or(|d| customer.birth_date == Some(d))
        && filter.from_birth_date.is_none_or(|d| customer.birth_date.is_some_and(|b| b >= d))
        && filter.to_birth_date.is_none_or(|d| customer.birth_date.is_some_and(|b| b <= d))
        && filter.num_of_children.is_none_or(|n| customer.num_of_children == Some(n))
        && equals(customer.national_number.as_deref(), &filter.national_number)
        && filter.verified.is_none_or(|v| customer.verified == v)
        && filter.blocked.is_none_or(|v| customer.blocked == v)
}

/// Espelho do UPDATE com COALESCE: None mantém o valor atual.
fn apply_update(changes: &CustomerUpdate, customer: &mut Customer) {
    fn set<T: Clone>(target: &mut T, value: &Option<T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }
    fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            *target = value.clone();
        }
    }

    set(&mut customer.first_name, &changes.first_name);
    set(&mut customer.last_name, &changes.last_name);
    set_opt(&mut customer.email, &changes.email);
    set_opt(&mut customer.job, &changes.job);
    set_opt(&mut customer.birth_date, &changes.birth_date);
    set_opt(&mut customer.phone, &changes.phone);
    set_opt(&mut customer.phone_number, &changes.phone_number);
    set_opt(&mut customer.marital_status, &changes.marital_status);
    set_opt(&mut customer.num_of_children, &changes.num_of_children);
    set_opt(&mut customer.national_number, &changes.national_number);
    set_opt(&mut customer.profile_picture, &changes.profile_picture);
    set(&mut customer.verified, &changes.verified);
    set(&mut customer.blocked, &changes.blocked);
}

fn national_number_taken(state: &CustomerState, national_number: &str, except: Uuid) -> bool {
    state.customers.iter().any(|c| {
        c.id != except && c.verified && c.national_number.as_deref() == Some(national_number)
    })
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.state().customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, AppError> {
        Ok(self
            .state()
            .customers
            .iter()
            .filter(|c| c.email.as_deref() == Some(email))
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn find_by_national_number(&self, national_number: &str) -> Result<Vec<Customer>, AppError> {
        let mut customers: Vec<Customer> = self
            .state()
            .customers
            .iter()
            .filter(|c| c.national_number.as_deref() == Some(national_number))
            .cloned()
            .collect();
        customers.sort_by_key(|c| c.created_at);
        Ok(customers)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.state().customers.iter().any(|c| c.username == username))
    }

    async fn insert(&self, new: NewCustomer) -> Result<Customer, AppError> {
        let mut state = self.state();

        let taken = state.customers.iter().any(|c| c.username == new.username)
            || (new.verified
                && new
                    .national_number
                    .as_deref()
                    .is_some_and(|n| national_number_taken(&state, n, Uuid::nil())));
        if taken {
            return Err(AppError::UniqueConstraintViolation(format!(
                "O usuário '{}' ou o documento já está cadastrado.",
                new.username
            )));
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            phone: new.phone,
            phone_number: new.phone_number,
            birth_date: new.birth_date,
            job: new.job,
            marital_status: new.marital_status,
            num_of_children: new.num_of_children,
            national_number: new.national_number,
            profile_picture: new.profile_picture,
            verified: new.verified,
            is_using_app: new.is_using_app,
            blocked: false,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn list(&self, filter: &CustomerFilter, page: PageRequest) -> Result<Page<Customer>, AppError> {
        let mut customers: Vec<Customer> = self
            .state()
            .customers
            .iter()
            .filter(|c| filter_matches(filter, c))
            .cloned()
            .collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(customers, page))
    }

    async fn list_with_missed_appointments(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CustomerMissedAppointments>, AppError> {
        let state = self.state();
        let filter = CustomerFilter { name: name.map(Into::into), ..Default::default() };

        let mut ranking: Vec<CustomerMissedAppointments> = state
            .customers
            .iter()
            .filter(|c| filter_matches(&filter, c))
            .map(|c| CustomerMissedAppointments {
                customer: c.clone(),
                missed_appointment_count: state
                    .appointments
                    .iter()
                    .filter(|a| a.customer_id == Some(c.id) && a.status.is_missed())
                    .count() as i64,
            })
            .filter(|m| m.missed_appointment_count > 0)
            .collect();
        ranking.sort_by(|a, b| {
            b.missed_appointment_count
                .cmp(&a.missed_appointment_count)
                .then_with(|| a.customer.last_name.cmp(&b.customer.last_name))
        });

        Ok(paginate(ranking, page))
    }

    async fn update(&self, id: Uuid, changes: &CustomerUpdate) -> Result<Option<Customer>, AppError> {
        let mut state = self.state();
        let Some(customer) = state.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        apply_update(changes, customer);
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.appointments.iter().any(|a| a.customer_id == Some(id)) {
            return Err(AppError::CustomerHasAppointments(id));
        }
        let before = state.customers.len();
        state.customers.retain(|c| c.id != id);
        Ok(state.customers.len() < before)
    }

    async fn toggle_blocked(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let mut state = self.state();
        Ok(state.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.blocked = !c.blocked;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn promote(&self, id: Uuid, national_number: &str) -> Result<Option<Customer>, AppError> {
        let mut state = self.state();
        if national_number_taken(&state, national_number, id) {
            return Err(AppError::UniqueConstraintViolation(
                "Documento já pertence a outro cliente verificado.".into(),
            ));
        }
        Ok(state.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.national_number = Some(national_number.into());
            c.verified = true;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn merge_into(&self, app_account_id: Uuid, walk_in_id: Uuid) -> Result<Customer, AppError> {
        // Tudo sob o mesmo lock: ou aplica as três etapas, ou nenhuma
        let mut state = self.state();

        let app_account = state
            .customers
            .iter()
            .find(|c| c.id == app_account_id)
            .cloned()
            .ok_or(AppError::CustomerNotFound(app_account_id))?;
        let walk_in = state
            .customers
            .iter()
            .find(|c| c.id == walk_in_id)
            .ok_or(AppError::CustomerNotFound(walk_in_id))?;
        if !walk_in.is_walk_in() {
            return Err(AppError::CustomerAlreadyVerified { customer_id: walk_in_id });
        }

        let now = Utc::now();
        for appointment in state
            .appointments
            .iter_mut()
            .filter(|a| a.customer_id == Some(app_account_id))
        {
            appointment.customer_id = Some(walk_in_id);
            appointment.updated_at = now;
        }

        state.customers.retain(|c| c.id != app_account_id);

        let merged = state
            .customers
            .iter_mut()
            .find(|c| c.id == walk_in_id)
            .ok_or(AppError::CustomerNotFound(walk_in_id))?;
        merged.is_using_app = true;
        merged.email = app_account.email;
        merged.username = app_account.username;
        merged.password_hash = app_account.password_hash;
        merged.updated_at = now;

        Ok(merged.clone())
    }

    async fn mark_email_verified(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Customer>, AppError> {
        if self.fail_email_stamps.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("falha simulada ao gravar email_verified_at").into());
        }
        let mut state = self.state();
        Ok(state.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.email_verified_at = Some(at);
            c.updated_at = at;
            c.clone()
        }))
    }
}

#[async_trait]
impl AppointmentStore for MemoryCustomerStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        Ok(self.state().appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_by_customer(&self, customer_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let mut appointments: Vec<Appointment> = self
            .state()
            .appointments
            .iter()
            .filter(|a| a.customer_id == Some(customer_id))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(appointments)
    }

    async fn reserve(&self, appointment_id: Uuid, customer_id: Uuid) -> Result<Option<Appointment>, AppError> {
        let mut state = self.state();
        Ok(state
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.is_bookable())
            .map(|a| {
                a.status = AppointmentStatus::Reserved;
                a.customer_id = Some(customer_id);
                a.updated_at = Utc::now();
                a.clone()
            }))
    }

    async fn count_by_status(&self, customer_id: Uuid) -> Result<Vec<(AppointmentStatus, i64)>, AppError> {
        let mut counts: HashMap<AppointmentStatus, i64> = HashMap::new();
        for appointment in self
            .state()
            .appointments
            .iter()
            .filter(|a| a.customer_id == Some(customer_id))
        {
            *counts.entry(appointment.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

// =========================================================================
//  OTP E E-MAIL
// =========================================================================

#[derive(Default)]
pub struct MemoryOtpStore {
    codes: Mutex<Vec<OneTimeCode>>,
}

impl MemoryOtpStore {
    fn codes(&self) -> MutexGuard<'_, Vec<OneTimeCode>> {
        self.codes.lock().unwrap()
    }

    pub fn codes_for(&self, identifier: &str) -> Vec<OneTimeCode> {
        self.codes().iter().filter(|c| c.identifier == identifier).cloned().collect()
    }

    /// Simula a passagem do tempo recuando o created_at de todos os códigos.
    pub fn age_codes(&self, by: Duration) {
        for code in self.codes().iter_mut() {
            code.created_at -= by;
        }
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn replace_code(
        &self,
        identifier: &str,
        token: &str,
        validity_minutes: i32,
    ) -> Result<OneTimeCode, AppError> {
        let mut codes = self.codes();
        codes.retain(|c| c.identifier != identifier);

        let code = OneTimeCode {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            token: token.into(),
            validity_minutes,
            valid: true,
            created_at: Utc::now(),
        };
        codes.push(code.clone());
        Ok(code)
    }

    async fn find_code(&self, identifier: &str, token: &str) -> Result<Option<OneTimeCode>, AppError> {
        Ok(self
            .codes()
            .iter()
            .filter(|c| c.identifier == identifier && c.token == token)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn invalidate(&self, id: Uuid) -> Result<bool, AppError> {
        let mut codes = self.codes();
        match codes.iter_mut().find(|c| c.id == id && c.valid) {
            Some(code) => {
                code.valid = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pending_identifiers(&self) -> Result<Vec<String>, AppError> {
        let mut identifiers: Vec<String> = self
            .codes()
            .iter()
            .filter(|c| c.valid)
            .map(|c| c.identifier.clone())
            .collect();
        identifiers.sort();
        identifiers.dedup();
        Ok(identifiers)
    }
}

/// Guarda (e-mail, código) de cada envio.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl RecordingMailer {
    /// Registra a tentativa, mas responde com erro de transporte.
    pub fn failing() -> Self {
        Self { failing: true, ..Default::default() }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push((email.into(), code.into()));
        if self.failing {
            return Err(anyhow::anyhow!("servidor de e-mail indisponível").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::crm::tests::customer;

    #[test]
    fn name_filter_matches_first_last_and_full_name() {
        let maria = customer("Maria", "Souza");
        let by = |name: &str| CustomerFilter { name: Some(name.into()), ..Default::default() };

        assert!(filter_matches(&by("mar"), &maria));
        assert!(filter_matches(&by(" SOUZA "), &maria));
        assert!(filter_matches(&by("maria sou"), &maria));
        assert!(!filter_matches(&by("joão"), &maria));
        assert!(filter_matches(&by("   "), &maria));
    }

    #[test]
    fn like_wildcards_in_terms_are_literal() {
        let mut axb = customer("Axb", "Lima");
        axb.username = "axb".into();

        let underscore = CustomerFilter { username: Some("a_b".into()), ..Default::default() };
        let percent = CustomerFilter { name: Some("a%".into()), ..Default::default() };
        assert!(!filter_matches(&underscore, &axb));
        assert!(!filter_matches(&percent, &axb));

        axb.username = "xa_by".into();
        assert!(filter_matches(&underscore, &axb));
    }

    #[test]
    fn birth_date_range_excludes_missing_dates() {
        let mut ana = customer("Ana", "Lima");
        let filter = CustomerFilter {
            from_birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            to_birth_date: NaiveDate::from_ymd_opt(1999, 12, 31),
            ..Default::default()
        };
        assert!(!filter_matches(&filter, &ana));

        ana.birth_date = NaiveDate::from_ymd_opt(1995, 6, 15);
        assert!(filter_matches(&filter, &ana));

        ana.birth_date = NaiveDate::from_ymd_opt(2001, 6, 15);
        assert!(!filter_matches(&filter, &ana));
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let mut ana = customer("Ana", "Lima");
        ana.job = Some("Professora".into());

        let changes = CustomerUpdate {
            last_name: Some("Costa".into()),
            blocked: Some(true),
            ..Default::default()
        };
        apply_update(&changes, &mut ana);

        assert_eq!(ana.first_name, "Ana");
        assert_eq!(ana.last_name, "Costa");
        assert_eq!(ana.job.as_deref(), Some("Professora"));
        assert!(ana.blocked);
    }
}
