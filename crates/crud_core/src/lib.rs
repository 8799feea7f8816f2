//! Core domain logic for the employee directory.
//! This crate owns the model invariants and the SQLite mapping.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::employee::{
    Address, AddressId, Employee, EmployeeId, EmployeeValidationError, EmploymentPeriod, Gender,
    PhoneNumber, PhoneNumberId,
};
pub use model::Model;
pub use repo::employee_repo::{EmployeeRepository, RepoError, RepoResult, SqliteEmployeeRepository};
pub use service::employee_service::{
    EmployeePage, EmployeeService, EmployeeServiceError, ServiceResult,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
