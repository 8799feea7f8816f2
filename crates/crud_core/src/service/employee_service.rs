//! Employee use-case service.
//!
//! # Responsibility
//! - Orchestrate load/mutate/persist cycles around the relation helpers.
//! - Validate reporting-line invariants above the repository layer.
//! - Provide paged and name-based listing.
//!
//! # Invariants
//! - An employee never manages itself, directly or through a chain.
//! - Every mutating call persists through `update_employee`, so optimistic
//!   version checks apply to all of them.
//! - Page size defaults to 10 and is clamped to 50.

use crate::model::employee::{Employee, EmployeeId, PhoneNumber, PhoneNumberId};
use crate::repo::employee_repo::{EmployeeRepository, RepoError, RepoResult};
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PAGE_DEFAULT_LIMIT: u32 = 10;
const PAGE_LIMIT_MAX: u32 = 50;
const ANY_NAME_PATTERN: &str = "%";

/// Service error for employee use-cases.
#[derive(Debug)]
pub enum EmployeeServiceError {
    EmployeeNotFound(EmployeeId),
    ManagerNotFound(EmployeeId),
    /// Manager and report are the same employee.
    SelfManagement(EmployeeId),
    /// Assignment would make `report_id` an indirect manager of itself.
    ManagementCycle {
        manager_id: EmployeeId,
        report_id: EmployeeId,
    },
    PhoneNumberNotFound {
        employee_id: EmployeeId,
        phone_id: PhoneNumberId,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for EmployeeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmployeeNotFound(id) => write!(f, "employee not found: {id}"),
            Self::ManagerNotFound(id) => write!(f, "manager not found: {id}"),
            Self::SelfManagement(id) => write!(f, "employee {id} cannot manage itself"),
            Self::ManagementCycle {
                manager_id,
                report_id,
            } => write!(
                f,
                "assigning manager {manager_id} to {report_id} would create a reporting cycle"
            ),
            Self::PhoneNumberNotFound {
                employee_id,
                phone_id,
            } => write!(
                f,
                "phone number {phone_id} not found on employee {employee_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent employee state: {details}")
            }
        }
    }
}

impl Error for EmployeeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EmployeeServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::EmployeeNotFound(id),
            RepoError::ManagerNotFound(id) => Self::ManagerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, EmployeeServiceError>;

/// One page of employees.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeePage {
    /// Items ordered by id.
    pub items: Vec<Employee>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
    /// Total number of employees at query time.
    pub total: u64,
}

/// Employee service facade over repository implementations.
pub struct EmployeeService<R: EmployeeRepository> {
    repo: R,
}

impl<R: EmployeeRepository> EmployeeService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a new employee and returns the stored state.
    pub fn hire(&self, employee: &Employee) -> ServiceResult<Employee> {
        let id = self.repo.create_employee(employee).inspect_err(|err| {
            warn!("event=employee_hire module=service status=error error={err}");
        })?;
        info!("event=employee_hire module=service status=ok employee_id={id}");
        self.read_back(id, "hired employee not found in read-back")
    }

    pub fn get(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        self.repo.get_employee(id)
    }

    /// Writes a full employee state and returns what was stored.
    ///
    /// A changed `manager_id` gets the same checks as [`Self::assign_manager`].
    pub fn update(&self, employee: &Employee) -> ServiceResult<Employee> {
        let stored = self.require(employee.id)?;
        if employee.manager_id != stored.manager_id {
            if let Some(manager_id) = employee.manager_id {
                if manager_id == employee.id {
                    return Err(EmployeeServiceError::SelfManagement(employee.id));
                }
                let manager = self
                    .repo
                    .get_employee(manager_id)?
                    .ok_or(EmployeeServiceError::ManagerNotFound(manager_id))?;
                self.ensure_no_cycle(&manager, employee.id)?;
            }
        }

        let version = self.repo.update_employee(employee)?;
        info!(
            "event=employee_update module=service status=ok employee_id={} version={}",
            employee.id, version
        );
        self.read_back(employee.id, "updated employee not found in read-back")
    }

    /// Deletes an employee. Owned parts go with it; reports are detached.
    pub fn terminate(&self, id: EmployeeId) -> ServiceResult<()> {
        self.repo.delete_employee(id)?;
        info!("event=employee_terminate module=service status=ok employee_id={id}");
        Ok(())
    }

    /// Makes `manager_id` the manager of `report_id`.
    ///
    /// Any previous manager is detached first. Returns the updated report.
    pub fn assign_manager(
        &self,
        manager_id: EmployeeId,
        report_id: EmployeeId,
    ) -> ServiceResult<Employee> {
        if manager_id == report_id {
            return Err(EmployeeServiceError::SelfManagement(report_id));
        }

        let mut manager = self
            .repo
            .get_employee(manager_id)?
            .ok_or(EmployeeServiceError::ManagerNotFound(manager_id))?;
        let mut report = self.require(report_id)?;

        if report.manager_id == Some(manager_id) {
            return Ok(report);
        }
        self.ensure_no_cycle(&manager, report_id)?;

        if let Some(previous_id) = report.manager_id {
            if let Some(mut previous) = self.repo.get_employee(previous_id)? {
                previous.remove_managed_employee(&mut report);
            }
        }
        manager.add_managed_employee(&mut report);

        self.repo.update_employee(&report)?;
        info!(
            "event=manager_assign module=service status=ok manager_id={manager_id} report_id={report_id}"
        );
        self.read_back(report_id, "report not found after manager assignment")
    }

    /// Clears the manager of `report_id`. No-op when it has none.
    pub fn unassign_manager(&self, report_id: EmployeeId) -> ServiceResult<Employee> {
        let mut report = self.require(report_id)?;
        let Some(manager_id) = report.manager_id else {
            return Ok(report);
        };

        match self.repo.get_employee(manager_id)? {
            Some(mut manager) => {
                manager.remove_managed_employee(&mut report);
            }
            None => report.manager_id = None,
        }

        self.repo.update_employee(&report)?;
        info!(
            "event=manager_unassign module=service status=ok manager_id={manager_id} report_id={report_id}"
        );
        self.read_back(report_id, "report not found after manager removal")
    }

    /// Adds a phone number built from `kind` and `number`.
    pub fn add_phone_number(
        &self,
        employee_id: EmployeeId,
        kind: impl Into<String>,
        number: impl Into<String>,
    ) -> ServiceResult<PhoneNumber> {
        let mut employee = self.require(employee_id)?;
        let phone = employee.add_phone_number_parts(kind, number).clone();
        self.repo.update_employee(&employee)?;
        Ok(phone)
    }

    /// Detaches and deletes one phone number. Returns the detached value.
    pub fn remove_phone_number(
        &self,
        employee_id: EmployeeId,
        phone_id: PhoneNumberId,
    ) -> ServiceResult<PhoneNumber> {
        let mut employee = self.require(employee_id)?;
        let removed = employee.remove_phone_number(phone_id).ok_or(
            EmployeeServiceError::PhoneNumberNotFound {
                employee_id,
                phone_id,
            },
        )?;
        self.repo.update_employee(&employee)?;
        Ok(removed)
    }

    pub fn add_responsibility(
        &self,
        employee_id: EmployeeId,
        responsibility: impl Into<String>,
    ) -> ServiceResult<Employee> {
        let mut employee = self.require(employee_id)?;
        employee.add_responsibility(responsibility);
        self.repo.update_employee(&employee)?;
        self.read_back(employee_id, "employee missing after responsibility change")
    }

    /// Removes the first matching responsibility. Unknown values are a no-op.
    pub fn remove_responsibility(
        &self,
        employee_id: EmployeeId,
        responsibility: &str,
    ) -> ServiceResult<Employee> {
        let mut employee = self.require(employee_id)?;
        if !employee.remove_responsibility(responsibility) {
            return Ok(employee);
        }
        self.repo.update_employee(&employee)?;
        self.read_back(employee_id, "employee missing after responsibility change")
    }

    /// Name search with SQL `LIKE` patterns. Blank or missing parts match any
    /// non-null value.
    pub fn search_by_name(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> RepoResult<Vec<Employee>> {
        self.repo
            .find_by_name(name_pattern(first_name), name_pattern(last_name))
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count()
    }

    pub fn count_by_name(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> RepoResult<u64> {
        self.repo
            .count_by_name(name_pattern(first_name), name_pattern(last_name))
    }

    /// Lists one page: a page of ids first, then the employees for them.
    pub fn list_page(&self, limit: Option<u32>, offset: u32) -> RepoResult<EmployeePage> {
        let applied_limit = normalize_page_limit(limit);
        let ids = self.repo.list_ids(applied_limit, offset)?;
        let items = self.repo.find_by_ids(&ids)?;
        let total = self.repo.count()?;
        Ok(EmployeePage {
            items,
            applied_limit,
            total,
        })
    }

    pub fn load_picture(&self, id: EmployeeId) -> ServiceResult<Option<Vec<u8>>> {
        Ok(self.repo.load_picture(id)?)
    }

    pub fn store_picture(&self, id: EmployeeId, picture: Option<&[u8]>) -> ServiceResult<()> {
        Ok(self.repo.store_picture(id, picture)?)
    }

    fn require(&self, id: EmployeeId) -> ServiceResult<Employee> {
        self.repo
            .get_employee(id)?
            .ok_or(EmployeeServiceError::EmployeeNotFound(id))
    }

    fn read_back(&self, id: EmployeeId, details: &'static str) -> ServiceResult<Employee> {
        self.repo
            .get_employee(id)?
            .ok_or(EmployeeServiceError::InconsistentState(details))
    }

    /// Walks up from `manager` and fails if `report_id` is on the chain.
    fn ensure_no_cycle(&self, manager: &Employee, report_id: EmployeeId) -> ServiceResult<()> {
        let mut visited = HashSet::from([manager.id]);
        let mut cursor = manager.manager_id;
        while let Some(current_id) = cursor {
            if current_id == report_id {
                return Err(EmployeeServiceError::ManagementCycle {
                    manager_id: manager.id,
                    report_id,
                });
            }
            if !visited.insert(current_id) {
                return Err(EmployeeServiceError::InconsistentState(
                    "existing reporting chain contains a cycle",
                ));
            }
            cursor = match self.repo.get_employee(current_id)? {
                Some(employee) => employee.manager_id,
                None => None,
            };
        }
        Ok(())
    }
}

/// Normalizes page limit: `None`/`0` use the default, large values clamp.
pub fn normalize_page_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => PAGE_DEFAULT_LIMIT,
        Some(value) => value.min(PAGE_LIMIT_MAX),
    }
}

fn name_pattern(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => ANY_NAME_PATTERN,
    }
}
