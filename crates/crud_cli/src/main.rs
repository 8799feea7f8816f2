//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `crud_core` linkage and that the configured database opens.
//! - Keep output deterministic for quick local sanity checks.

use crud_core::db::open_db;
use crud_core::{init_logging, CoreConfig, EmployeeService, SqliteEmployeeRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("crud_core ping={}", crud_core::ping());
    println!("crud_core version={}", crud_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(config.log_level, &log_dir.to_string_lossy()).map_err(|err| err.to_string())?;
    }

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteEmployeeRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let service = EmployeeService::new(repo);
    let total = service.count().map_err(|err| err.to_string())?;

    log::info!("event=cli_probe module=cli status=ok employees={total}");
    println!("db_path={}", config.db_path.display());
    println!("employees={total}");
    Ok(())
}
