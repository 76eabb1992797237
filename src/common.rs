pub mod error;
pub mod secrets;
pub mod telemetry;
