pub mod appointment;
pub mod crm;
pub mod hr;
pub mod pagination;
pub mod verification;
