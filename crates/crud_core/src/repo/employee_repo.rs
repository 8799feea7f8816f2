//! Employee repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and named-query APIs over the `EMPLOYEE` table and the
//!   tables it owns (`SALARY`, `RESPONS`, `PHONE`, `ADDRESS`).
//! - Keep SQL details inside core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Employee::validate()` before SQL mutations.
//! - Owned parts follow the owner: phone numbers, responsibilities, salary
//!   and address are written, replaced and deleted together with it.
//! - Reports are never deleted with their manager; `MANAGER_ID` is nulled.
//! - `managed_employee_ids` is read-only here; the report's `manager_id`
//!   is the persisted side of the relation.
//! - `PICTURE` is only read through [`EmployeeRepository::load_picture`].

use crate::db::migrations::latest_version;
use crate::db::{is_unique_violation, DbError};
use crate::model::employee::{
    Address, AddressId, Employee, EmployeeId, EmployeeValidationError, EmploymentPeriod, Gender,
    PhoneNumber, PhoneNumberId,
};
use crate::repo::{table_exists, table_has_column};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const EMPLOYEE_SELECT_SQL: &str = "SELECT
    e.ID AS id,
    e.SSN AS ssn,
    e.HONORIFIC AS honorific,
    e.FIRST_NAME AS first_name,
    e.LAST_NAME AS last_name,
    e.SUFFIX AS suffix,
    e.EMAIL AS email,
    e.BIRTHDATE AS birthdate,
    e.AGE AS age,
    e.GENDER AS gender,
    e.MANAGER_ID AS manager_id,
    e.START_DATE AS start_date,
    e.END_DATE AS end_date,
    e.VERSION AS version,
    e.CREATED_AT AS created_at,
    e.MODIFIED_AT AS modified_at,
    COALESCE(s.SALARY, 0.0) AS salary,
    a.ID AS address_id,
    a.STREET AS street,
    a.CITY AS city,
    a.PROVINCE AS province,
    a.POSTAL_CODE AS postal_code,
    a.COUNTRY AS country
FROM EMPLOYEE e
LEFT JOIN SALARY s ON s.EMP_ID = e.ID
LEFT JOIN ADDRESS a ON a.ID = e.ADDRESS_ID";

const EMPLOYEE_COLUMNS: &[&str] = &[
    "ID",
    "SSN",
    "HONORIFIC",
    "FIRST_NAME",
    "LAST_NAME",
    "SUFFIX",
    "EMAIL",
    "BIRTHDATE",
    "AGE",
    "GENDER",
    "PICTURE",
    "MANAGER_ID",
    "ADDRESS_ID",
    "START_DATE",
    "END_DATE",
    "VERSION",
    "CREATED_AT",
    "MODIFIED_AT",
];

/// SQLite keeps at most 32766 host parameters; stay far below it.
const ID_LIST_CHUNK: usize = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for employee persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EmployeeValidationError),
    Db(DbError),
    NotFound(EmployeeId),
    /// `manager_id` points at an employee that does not exist.
    ManagerNotFound(EmployeeId),
    /// Another employee already uses this social security number.
    DuplicateSsn(String),
    /// The row was changed since the caller loaded it.
    StaleVersion {
        id: EmployeeId,
        expected: i64,
        actual: i64,
    },
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
    /// The phone number id is still stored under another employee.
    PhoneNumberInUse(PhoneNumberId),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "employee not found: {id}"),
            Self::ManagerNotFound(id) => write!(f, "manager not found: {id}"),
            // No PII in messages.
            Self::DuplicateSsn(_) => write!(f, "social security number already in use"),
            Self::StaleVersion {
                id,
                expected,
                actual,
            } => write!(
                f,
                "employee {id} was modified concurrently (expected version {expected}, found {actual})"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "employee repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "employee repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "employee repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted employee data: {message}"),
            Self::PhoneNumberInUse(id) => write!(
                f,
                "phone number {id} still belongs to another employee; persist its previous owner first"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EmployeeValidationError> for RepoError {
    fn from(value: EmployeeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for employee CRUD and named queries.
pub trait EmployeeRepository {
    /// Inserts the employee with all owned parts. Returns its id.
    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId>;
    /// Replaces the stored employee and owned parts. Returns the new version.
    ///
    /// A phone number moved from another employee needs that employee
    /// persisted first, otherwise this fails with `PhoneNumberInUse`.
    fn update_employee(&self, employee: &Employee) -> RepoResult<i64>;
    /// Loads one employee without its picture.
    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>>;
    /// Deletes the employee and owned parts, detaching its reports.
    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()>;
    /// All employees ordered by id.
    fn find_all(&self) -> RepoResult<Vec<Employee>>;
    /// Employees whose names match SQL `LIKE` patterns, ordered by id.
    fn find_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<Vec<Employee>>;
    fn count(&self) -> RepoResult<u64>;
    fn count_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<u64>;
    /// Employees with the given ids, ordered by id. Unknown ids are skipped.
    fn find_by_ids(&self, ids: &[EmployeeId]) -> RepoResult<Vec<Employee>>;
    fn find_by_ssn(&self, ssn: &str) -> RepoResult<Option<Employee>>;
    /// One page of ids in ascending order.
    fn list_ids(&self, limit: u32, offset: u32) -> RepoResult<Vec<EmployeeId>>;
    /// Loads the lazily fetched picture blob.
    fn load_picture(&self, id: EmployeeId) -> RepoResult<Option<Vec<u8>>>;
    /// Replaces or clears the picture blob.
    fn store_picture(&self, id: EmployeeId, picture: Option<&[u8]>) -> RepoResult<()>;
}

/// SQLite-backed employee repository.
pub struct SqliteEmployeeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_employee_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EmployeeRepository for SqliteEmployeeRepository<'_> {
    fn create_employee(&self, employee: &Employee) -> RepoResult<EmployeeId> {
        employee.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_manager_exists(&tx, employee.manager_id)?;

        if let Some(address) = employee.address.as_ref() {
            upsert_address(&tx, address)?;
        }

        let period = employee.period.unwrap_or_default();
        tx.execute(
            "INSERT INTO EMPLOYEE (
                ID,
                SSN,
                HONORIFIC,
                FIRST_NAME,
                LAST_NAME,
                SUFFIX,
                EMAIL,
                BIRTHDATE,
                AGE,
                GENDER,
                PICTURE,
                MANAGER_ID,
                ADDRESS_ID,
                START_DATE,
                END_DATE,
                VERSION
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 1);",
            params![
                employee.id,
                employee.social_security_number.as_str(),
                employee.honorific.as_deref(),
                employee.first_name.as_deref(),
                employee.last_name.as_deref(),
                employee.suffix.as_deref(),
                employee.email.as_deref(),
                employee.birthdate,
                employee.age,
                employee.gender,
                employee.picture.as_deref(),
                employee.manager_id,
                employee.address.as_ref().map(|address| address.id),
                period.start_date,
                period.end_date,
            ],
        )
        .map_err(|err| map_write_error(err, employee))?;

        upsert_salary(&tx, employee)?;
        replace_phone_numbers(&tx, employee)?;
        replace_responsibilities(&tx, employee)?;

        tx.commit()?;
        Ok(employee.id)
    }

    fn update_employee(&self, employee: &Employee) -> RepoResult<i64> {
        employee.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let current: Option<(i64, Option<AddressId>)> = tx
            .query_row(
                "SELECT VERSION, ADDRESS_ID FROM EMPLOYEE WHERE ID = ?1;",
                [employee.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((actual_version, previous_address_id)) = current else {
            return Err(RepoError::NotFound(employee.id));
        };
        if actual_version != employee.version {
            return Err(RepoError::StaleVersion {
                id: employee.id,
                expected: employee.version,
                actual: actual_version,
            });
        }
        ensure_manager_exists(&tx, employee.manager_id)?;

        if let Some(address) = employee.address.as_ref() {
            upsert_address(&tx, address)?;
        }

        let period = employee.period.unwrap_or_default();
        tx.execute(
            "UPDATE EMPLOYEE
             SET
                SSN = ?2,
                HONORIFIC = ?3,
                FIRST_NAME = ?4,
                LAST_NAME = ?5,
                SUFFIX = ?6,
                EMAIL = ?7,
                BIRTHDATE = ?8,
                AGE = ?9,
                GENDER = ?10,
                PICTURE = COALESCE(?11, PICTURE),
                MANAGER_ID = ?12,
                ADDRESS_ID = ?13,
                START_DATE = ?14,
                END_DATE = ?15,
                VERSION = VERSION + 1,
                MODIFIED_AT = (strftime('%s', 'now') * 1000)
             WHERE ID = ?1;",
            params![
                employee.id,
                employee.social_security_number.as_str(),
                employee.honorific.as_deref(),
                employee.first_name.as_deref(),
                employee.last_name.as_deref(),
                employee.suffix.as_deref(),
                employee.email.as_deref(),
                employee.birthdate,
                employee.age,
                employee.gender,
                employee.picture.as_deref(),
                employee.manager_id,
                employee.address.as_ref().map(|address| address.id),
                period.start_date,
                period.end_date,
            ],
        )
        .map_err(|err| map_write_error(err, employee))?;

        // Orphaned address: detached or replaced by another one.
        if let Some(previous_id) = previous_address_id {
            let still_linked = employee
                .address
                .as_ref()
                .is_some_and(|address| address.id == previous_id);
            if !still_linked {
                tx.execute("DELETE FROM ADDRESS WHERE ID = ?1;", [previous_id])?;
            }
        }

        upsert_salary(&tx, employee)?;
        replace_phone_numbers(&tx, employee)?;
        replace_responsibilities(&tx, employee)?;

        tx.commit()?;
        Ok(actual_version + 1)
    }

    fn get_employee(&self, id: EmployeeId) -> RepoResult<Option<Employee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE e.ID = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(load_employee(self.conn, row)?));
        }
        Ok(None)
    }

    fn delete_employee(&self, id: EmployeeId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let address_id: Option<Option<AddressId>> = tx
            .query_row(
                "SELECT ADDRESS_ID FROM EMPLOYEE WHERE ID = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(address_id) = address_id else {
            return Err(RepoError::NotFound(id));
        };

        // SALARY, RESPONS and PHONE cascade; reports get MANAGER_ID = NULL.
        tx.execute("DELETE FROM EMPLOYEE WHERE ID = ?1;", [id])?;
        if let Some(address_id) = address_id {
            tx.execute("DELETE FROM ADDRESS WHERE ID = ?1;", [address_id])?;
        }

        tx.commit()?;
        Ok(())
    }

    fn find_all(&self) -> RepoResult<Vec<Employee>> {
        query_employees(
            self.conn,
            &format!("{EMPLOYEE_SELECT_SQL} ORDER BY e.ID ASC;"),
            Vec::new(),
        )
    }

    fn find_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<Vec<Employee>> {
        query_employees(
            self.conn,
            &format!(
                "{EMPLOYEE_SELECT_SQL}
                 WHERE e.FIRST_NAME LIKE ?1
                   AND e.LAST_NAME LIKE ?2
                 ORDER BY e.ID ASC;"
            ),
            vec![
                Value::Text(first_name.to_string()),
                Value::Text(last_name.to_string()),
            ],
        )
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM EMPLOYEE;", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_name(&self, first_name: &str, last_name: &str) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM EMPLOYEE
             WHERE FIRST_NAME LIKE ?1
               AND LAST_NAME LIKE ?2;",
            params![first_name, last_name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn find_by_ids(&self, ids: &[EmployeeId]) -> RepoResult<Vec<Employee>> {
        let unique: Vec<EmployeeId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut employees = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(ID_LIST_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "{EMPLOYEE_SELECT_SQL} WHERE e.ID IN ({placeholders}) ORDER BY e.ID ASC;"
            );
            let bind_values = chunk.iter().map(|id| Value::Integer(*id)).collect();
            employees.extend(query_employees(self.conn, &sql, bind_values)?);
        }

        Ok(employees)
    }

    fn find_by_ssn(&self, ssn: &str) -> RepoResult<Option<Employee>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EMPLOYEE_SELECT_SQL} WHERE e.SSN = ?1;"))?;
        let mut rows = stmt.query([ssn])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(load_employee(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_ids(&self, limit: u32, offset: u32) -> RepoResult<Vec<EmployeeId>> {
        let mut stmt = self.conn.prepare(
            "SELECT ID
             FROM EMPLOYEE
             ORDER BY ID ASC
             LIMIT ?1 OFFSET ?2;",
        )?;
        let mut rows = stmt.query(params![i64::from(limit), i64::from(offset)])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn load_picture(&self, id: EmployeeId) -> RepoResult<Option<Vec<u8>>> {
        let picture: Option<Option<Vec<u8>>> = self
            .conn
            .query_row(
                "SELECT PICTURE FROM EMPLOYEE WHERE ID = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        picture.ok_or(RepoError::NotFound(id))
    }

    fn store_picture(&self, id: EmployeeId, picture: Option<&[u8]>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE EMPLOYEE
             SET
                PICTURE = ?2,
                MODIFIED_AT = (strftime('%s', 'now') * 1000)
             WHERE ID = ?1;",
            params![id, picture],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn query_employees(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Employee>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut employees = Vec::new();
    while let Some(row) = rows.next()? {
        employees.push(load_employee(conn, row)?);
    }
    Ok(employees)
}

/// Parses one joined row and loads the collections hanging off it.
fn load_employee(conn: &Connection, row: &Row<'_>) -> RepoResult<Employee> {
    let mut employee = parse_employee_row(row)?;
    employee.managed_employee_ids = load_managed_employee_ids(conn, employee.id)?;
    employee.phone_numbers = load_phone_numbers(conn, employee.id)?;
    employee.responsibilities = load_responsibilities(conn, employee.id)?;
    employee.validate()?;
    Ok(employee)
}

fn parse_employee_row(row: &Row<'_>) -> RepoResult<Employee> {
    let id: EmployeeId = row.get("id")?;
    let gender = row.get::<_, Gender>("gender").map_err(|err| {
        RepoError::InvalidData(format!("invalid value in EMPLOYEE.GENDER for {id}: {err}"))
    })?;

    let period = EmploymentPeriod::new(row.get("start_date")?, row.get("end_date")?);
    let address = match row.get::<_, Option<AddressId>>("address_id")? {
        Some(address_id) => Some(Address {
            id: address_id,
            street: row.get("street")?,
            city: row.get("city")?,
            province: row.get("province")?,
            postal_code: row.get("postal_code")?,
            country: row.get("country")?,
        }),
        None => None,
    };

    let mut employee = Employee::with_id(id, row.get::<_, String>("ssn")?)?;
    employee.honorific = row.get("honorific")?;
    employee.first_name = row.get("first_name")?;
    employee.last_name = row.get("last_name")?;
    employee.suffix = row.get("suffix")?;
    employee.email = row.get("email")?;
    employee.birthdate = row.get("birthdate")?;
    employee.age = row.get("age")?;
    employee.gender = gender;
    employee.salary = row.get("salary")?;
    employee.manager_id = row.get("manager_id")?;
    employee.address = address;
    employee.period = (!period.is_empty()).then_some(period);
    employee.version = row.get("version")?;
    employee.created_at = row.get("created_at")?;
    employee.modified_at = row.get("modified_at")?;
    Ok(employee)
}

fn load_managed_employee_ids(conn: &Connection, id: EmployeeId) -> RepoResult<Vec<EmployeeId>> {
    let mut stmt = conn.prepare(
        "SELECT ID
         FROM EMPLOYEE
         WHERE MANAGER_ID = ?1
         ORDER BY ID ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn load_phone_numbers(conn: &Connection, owner_id: EmployeeId) -> RepoResult<Vec<PhoneNumber>> {
    let mut stmt = conn.prepare(
        "SELECT ID, TYPE, NUMBER
         FROM PHONE
         WHERE OWNER_ID = ?1
         ORDER BY POSITION ASC, ID ASC;",
    )?;
    let mut rows = stmt.query([owner_id])?;
    let mut phones = Vec::new();
    while let Some(row) = rows.next()? {
        phones.push(PhoneNumber {
            id: row.get("ID")?,
            owner_id: Some(owner_id),
            kind: row.get("TYPE")?,
            number: row.get("NUMBER")?,
        });
    }
    Ok(phones)
}

fn load_responsibilities(conn: &Connection, id: EmployeeId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT RESPONSIBILITY
         FROM RESPONS
         WHERE EMPLOYEE_ID = ?1
         ORDER BY POSITION ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn upsert_address(conn: &Connection, address: &Address) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO ADDRESS (ID, STREET, CITY, PROVINCE, POSTAL_CODE, COUNTRY)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(ID) DO UPDATE SET
            STREET = excluded.STREET,
            CITY = excluded.CITY,
            PROVINCE = excluded.PROVINCE,
            POSTAL_CODE = excluded.POSTAL_CODE,
            COUNTRY = excluded.COUNTRY;",
        params![
            address.id,
            address.street.as_deref(),
            address.city.as_deref(),
            address.province.as_deref(),
            address.postal_code.as_deref(),
            address.country.as_deref(),
        ],
    )?;
    Ok(())
}

fn upsert_salary(conn: &Connection, employee: &Employee) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO SALARY (EMP_ID, SALARY)
         VALUES (?1, ?2)
         ON CONFLICT(EMP_ID) DO UPDATE SET SALARY = excluded.SALARY;",
        params![employee.id, employee.salary],
    )?;
    Ok(())
}

/// Rewrites the phone list; rows missing from `employee` are deleted.
fn replace_phone_numbers(conn: &Connection, employee: &Employee) -> RepoResult<()> {
    conn.execute("DELETE FROM PHONE WHERE OWNER_ID = ?1;", [employee.id])?;
    for (position, phone) in employee.phone_numbers.iter().enumerate() {
        conn.execute(
            "INSERT INTO PHONE (ID, OWNER_ID, TYPE, NUMBER, POSITION)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                phone.id,
                employee.id,
                phone.kind.as_str(),
                phone.number.as_str(),
                position as i64,
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err, "PHONE", "ID") {
                RepoError::PhoneNumberInUse(phone.id)
            } else {
                err.into()
            }
        })?;
    }
    Ok(())
}

fn replace_responsibilities(conn: &Connection, employee: &Employee) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM RESPONS WHERE EMPLOYEE_ID = ?1;",
        [employee.id],
    )?;
    for (position, responsibility) in employee.responsibilities.iter().enumerate() {
        conn.execute(
            "INSERT INTO RESPONS (EMPLOYEE_ID, POSITION, RESPONSIBILITY)
             VALUES (?1, ?2, ?3);",
            params![employee.id, position as i64, responsibility.as_str()],
        )?;
    }
    Ok(())
}

fn ensure_manager_exists(conn: &Connection, manager_id: Option<EmployeeId>) -> RepoResult<()> {
    let Some(manager_id) = manager_id else {
        return Ok(());
    };
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM EMPLOYEE WHERE ID = ?1);",
        [manager_id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::ManagerNotFound(manager_id))
    }
}

fn map_write_error(err: rusqlite::Error, employee: &Employee) -> RepoError {
    if is_unique_violation(&err, "EMPLOYEE", "SSN") {
        RepoError::DuplicateSsn(employee.social_security_number.clone())
    } else {
        err.into()
    }
}

fn ensure_employee_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["EMPLOYEE", "SALARY", "RESPONS", "PHONE", "ADDRESS"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in EMPLOYEE_COLUMNS.iter().copied() {
        if !table_has_column(conn, "EMPLOYEE", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "EMPLOYEE",
                column,
            });
        }
    }

    Ok(())
}
