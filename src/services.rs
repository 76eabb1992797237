pub mod appointment_service;
pub mod customer_service;
pub mod employee_attributes;
pub mod employee_service;
pub mod notification;
pub mod verification_service;
