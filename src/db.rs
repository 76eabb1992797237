pub mod employee_repo;
pub use employee_repo::{EmployeeRepository, EmployeeStore};
pub mod customer_repo;
pub use customer_repo::{CustomerRepository, CustomerStore};
pub mod appointment_repo;
pub use appointment_repo::{AppointmentRepository, AppointmentStore};
pub mod otp_repo;
pub use otp_repo::{OtpRepository, OtpStore};
