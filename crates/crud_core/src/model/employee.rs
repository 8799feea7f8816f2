//! Employee domain model.
//!
//! # Responsibility
//! - Define the employee record and the value types it owns.
//! - Keep both sides of manager/report and owner/phone pairs consistent.
//!
//! # Invariants
//! - `id` is a positive flake id and never reused for another employee.
//! - `age` stays within `[0, 125]`; `birthdate`, if set, is in the past.
//! - Every phone number in `phone_numbers` has `owner_id == Some(self.id)`.
//! - `report.manager_id == Some(m.id)` iff `m.managed_employee_ids`
//!   contains `report.id`, as long as mutation goes through the helpers.
//!
//! # See also
//! - crate::repo::employee_repo for the storage mapping.

use crate::model::flake;
use crate::model::Model;
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable employee identifier.
pub type EmployeeId = i64;
/// Stable phone number identifier.
pub type PhoneNumberId = i64;
/// Stable address identifier.
pub type AddressId = i64;

pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 125;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Gender, persisted as a single-character code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Storage code for this value.
    pub fn code(self) -> char {
        match self {
            Self::Male => 'M',
            Self::Female => 'F',
        }
    }

    /// Parses a storage code. Case-sensitive.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'M' => Some(Self::Male),
            'F' => Some(Self::Female),
            _ => None,
        }
    }
}

impl ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let code = match self {
            Self::Male => "M",
            Self::Female => "F",
        };
        Ok(ToSqlOutput::from(code))
    }
}

impl FromSql for Gender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => Self::from_code(code).ok_or_else(|| {
                FromSqlError::Other(format!("unknown gender code `{text}`").into())
            }),
            _ => Err(FromSqlError::Other(
                format!("gender code must be one character, got `{text}`").into(),
            )),
        }
    }
}

/// Employment period embedded inline in the employee row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EmploymentPeriod {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Both dates unset; stored as two NULL columns.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Postal address owned 1:1 by an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub street: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Creates an empty address with a generated id.
    pub fn new() -> Self {
        Self {
            id: flake::next_id(),
            street: None,
            city: None,
            province: None,
            postal_code: None,
            country: None,
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::new()
    }
}

/// Phone number privately owned by one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: PhoneNumberId,
    /// Back-reference to the owning employee. `None` while detached.
    pub owner_id: Option<EmployeeId>,
    /// Serialized as `type` (e.g. `work`, `cell`).
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

impl PhoneNumber {
    /// Creates a detached phone number with a generated id.
    pub fn new(kind: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: flake::next_id(),
            owner_id: None,
            kind: kind.into(),
            number: number.into(),
        }
    }
}

/// Validation failures for employee write/read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeValidationError {
    NonPositiveId(EmployeeId),
    BlankSsn,
    AgeOutOfRange(i32),
    BirthdateNotInPast {
        birthdate: NaiveDate,
        today: NaiveDate,
    },
    /// Email is set but not shaped like `local@domain.tld`.
    MalformedEmail,
    InvalidPeriod {
        start: NaiveDate,
        end: NaiveDate,
    },
    BlankPhoneField {
        phone_id: PhoneNumberId,
        field: &'static str,
    },
    ForeignPhoneNumber {
        phone_id: PhoneNumberId,
        owner_id: Option<EmployeeId>,
    },
    SelfManaged(EmployeeId),
}

impl Display for EmployeeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveId(id) => write!(f, "employee id must be positive, got {id}"),
            Self::BlankSsn => write!(f, "social security number must not be blank"),
            Self::AgeOutOfRange(age) => {
                write!(f, "age ({age}) must be within {MIN_AGE}..={MAX_AGE}")
            }
            Self::BirthdateNotInPast { birthdate, today } => {
                write!(f, "birthdate ({birthdate}) must be before {today}")
            }
            Self::MalformedEmail => write!(f, "email address is malformed"),
            Self::InvalidPeriod { start, end } => {
                write!(f, "period end_date ({end}) must be >= start_date ({start})")
            }
            Self::BlankPhoneField { phone_id, field } => {
                write!(f, "phone number {phone_id} has blank {field}")
            }
            Self::ForeignPhoneNumber { phone_id, owner_id } => match owner_id {
                Some(owner_id) => write!(
                    f,
                    "phone number {phone_id} is owned by employee {owner_id}"
                ),
                None => write!(f, "phone number {phone_id} has no owner"),
            },
            Self::SelfManaged(id) => write!(f, "employee {id} cannot manage itself"),
        }
    }
}

impl Error for EmployeeValidationError {}

/// Employee record.
///
/// Relations to other employees are held as ids; owned parts (phone
/// numbers, address, period) are held by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EmployeeWire")]
pub struct Employee {
    pub id: EmployeeId,
    /// Serialized as `ssn`. Unique across employees.
    #[serde(rename = "ssn")]
    pub social_security_number: String,
    pub honorific: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub age: i32,
    pub gender: Gender,
    /// Stored in the `SALARY` secondary table.
    pub salary: f64,
    /// Large object; only populated when loaded explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<Vec<u8>>,
    pub manager_id: Option<EmployeeId>,
    /// Inverse side of `manager_id`; derived from storage, never written.
    pub managed_employee_ids: Vec<EmployeeId>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub address: Option<Address>,
    pub period: Option<EmploymentPeriod>,
    pub responsibilities: Vec<String>,
    /// Optimistic lock counter. `0` until first persisted.
    pub version: i64,
    /// Epoch ms, set by storage.
    pub created_at: Option<i64>,
    /// Epoch ms, set by storage.
    pub modified_at: Option<i64>,
}

impl Employee {
    /// Creates a new employee with a generated id.
    pub fn new(
        social_security_number: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let mut employee = Self::blank(flake::next_id(), social_security_number.into());
        employee.first_name = Some(first_name.into());
        employee.last_name = Some(last_name.into());
        employee
    }

    /// Creates an employee with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        id: EmployeeId,
        social_security_number: impl Into<String>,
    ) -> Result<Self, EmployeeValidationError> {
        if id <= 0 {
            return Err(EmployeeValidationError::NonPositiveId(id));
        }
        Ok(Self::blank(id, social_security_number.into()))
    }

    fn blank(id: EmployeeId, social_security_number: String) -> Self {
        Self {
            id,
            social_security_number,
            honorific: None,
            first_name: None,
            last_name: None,
            suffix: None,
            email: None,
            birthdate: None,
            age: 0,
            gender: Gender::default(),
            salary: 0.0,
            picture: None,
            manager_id: None,
            managed_employee_ids: Vec::new(),
            phone_numbers: Vec::new(),
            address: None,
            period: None,
            responsibilities: Vec::new(),
            version: 0,
            created_at: None,
            modified_at: None,
        }
    }

    /// Adds `employee` as a direct report and points its manager back here.
    ///
    /// Adding the same report twice keeps a single entry. The caller is
    /// responsible for detaching the report from a previous manager.
    pub fn add_managed_employee<'a>(&mut self, employee: &'a mut Employee) -> &'a mut Employee {
        if !self.managed_employee_ids.contains(&employee.id) {
            self.managed_employee_ids.push(employee.id);
        }
        employee.manager_id = Some(self.id);
        employee
    }

    /// Removes `employee` from the direct reports and clears its manager.
    ///
    /// The back-reference is only cleared when it points at `self`.
    pub fn remove_managed_employee<'a>(
        &mut self,
        employee: &'a mut Employee,
    ) -> &'a mut Employee {
        self.managed_employee_ids.retain(|id| *id != employee.id);
        if employee.manager_id == Some(self.id) {
            employee.manager_id = None;
        }
        employee
    }

    /// Takes ownership of `phone_number` and returns the stored entry.
    pub fn add_phone_number(&mut self, mut phone_number: PhoneNumber) -> &PhoneNumber {
        phone_number.owner_id = Some(self.id);
        let index = match self
            .phone_numbers
            .iter()
            .position(|existing| existing.id == phone_number.id)
        {
            Some(index) => {
                self.phone_numbers[index] = phone_number;
                index
            }
            None => {
                self.phone_numbers.push(phone_number);
                self.phone_numbers.len() - 1
            }
        };
        &self.phone_numbers[index]
    }

    /// Builds a phone number from `kind` and `number` and adds it.
    pub fn add_phone_number_parts(
        &mut self,
        kind: impl Into<String>,
        number: impl Into<String>,
    ) -> &PhoneNumber {
        self.add_phone_number(PhoneNumber::new(kind, number))
    }

    /// Detaches one phone number and returns it with its owner cleared.
    ///
    /// The returned value is an orphan: persisting this employee deletes it.
    pub fn remove_phone_number(&mut self, phone_id: PhoneNumberId) -> Option<PhoneNumber> {
        let index = self
            .phone_numbers
            .iter()
            .position(|phone| phone.id == phone_id)?;
        let mut removed = self.phone_numbers.remove(index);
        removed.owner_id = None;
        Some(removed)
    }

    pub fn phone_number(&self, phone_id: PhoneNumberId) -> Option<&PhoneNumber> {
        self.phone_numbers.iter().find(|phone| phone.id == phone_id)
    }

    pub fn add_responsibility(&mut self, responsibility: impl Into<String>) {
        self.responsibilities.push(responsibility.into());
    }

    /// Removes the first matching entry. Returns whether one was removed.
    pub fn remove_responsibility(&mut self, responsibility: &str) -> bool {
        match self
            .responsibilities
            .iter()
            .position(|value| value == responsibility)
        {
            Some(index) => {
                self.responsibilities.remove(index);
                true
            }
            None => false,
        }
    }

    /// Checks declared constraints against today's UTC date.
    pub fn validate(&self) -> Result<(), EmployeeValidationError> {
        self.validate_at(Utc::now().date_naive())
    }

    /// Checks declared constraints against a fixed reference date.
    pub fn validate_at(&self, today: NaiveDate) -> Result<(), EmployeeValidationError> {
        if self.id <= 0 {
            return Err(EmployeeValidationError::NonPositiveId(self.id));
        }
        if self.social_security_number.trim().is_empty() {
            return Err(EmployeeValidationError::BlankSsn);
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(EmployeeValidationError::AgeOutOfRange(self.age));
        }
        if let Some(birthdate) = self.birthdate {
            if birthdate >= today {
                return Err(EmployeeValidationError::BirthdateNotInPast { birthdate, today });
            }
        }
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_RE.is_match(email.trim()) {
                return Err(EmployeeValidationError::MalformedEmail);
            }
        }
        if let Some(EmploymentPeriod {
            start_date: Some(start),
            end_date: Some(end),
        }) = self.period
        {
            if end < start {
                return Err(EmployeeValidationError::InvalidPeriod { start, end });
            }
        }
        if self.manager_id == Some(self.id) {
            return Err(EmployeeValidationError::SelfManaged(self.id));
        }
        for phone in &self.phone_numbers {
            if phone.owner_id != Some(self.id) {
                return Err(EmployeeValidationError::ForeignPhoneNumber {
                    phone_id: phone.id,
                    owner_id: phone.owner_id,
                });
            }
            if phone.kind.trim().is_empty() {
                return Err(EmployeeValidationError::BlankPhoneField {
                    phone_id: phone.id,
                    field: "type",
                });
            }
            if phone.number.trim().is_empty() {
                return Err(EmployeeValidationError::BlankPhoneField {
                    phone_id: phone.id,
                    field: "number",
                });
            }
        }
        Ok(())
    }

    /// `"first last"` with missing parts skipped.
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Model for Employee {
    type Id = EmployeeId;

    fn id(&self) -> EmployeeId {
        self.id
    }

    fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    fn modified_at(&self) -> Option<i64> {
        self.modified_at
    }
}

/// Unvalidated deserialization shape for [`Employee`].
#[derive(Deserialize)]
struct EmployeeWire {
    id: EmployeeId,
    ssn: String,
    #[serde(default)]
    honorific: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    birthdate: Option<NaiveDate>,
    #[serde(default)]
    age: i32,
    #[serde(default)]
    gender: Gender,
    #[serde(default)]
    salary: f64,
    #[serde(default)]
    picture: Option<Vec<u8>>,
    #[serde(default)]
    manager_id: Option<EmployeeId>,
    #[serde(default)]
    managed_employee_ids: Vec<EmployeeId>,
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    period: Option<EmploymentPeriod>,
    #[serde(default)]
    responsibilities: Vec<String>,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    modified_at: Option<i64>,
}

impl TryFrom<EmployeeWire> for Employee {
    type Error = EmployeeValidationError;

    fn try_from(wire: EmployeeWire) -> Result<Self, Self::Error> {
        let employee = Employee {
            id: wire.id,
            social_security_number: wire.ssn,
            honorific: wire.honorific,
            first_name: wire.first_name,
            last_name: wire.last_name,
            suffix: wire.suffix,
            email: wire.email,
            birthdate: wire.birthdate,
            age: wire.age,
            gender: wire.gender,
            salary: wire.salary,
            picture: wire.picture,
            manager_id: wire.manager_id,
            managed_employee_ids: wire.managed_employee_ids,
            phone_numbers: wire.phone_numbers,
            address: wire.address,
            period: wire.period,
            responsibilities: wire.responsibilities,
            version: wire.version,
            created_at: wire.created_at,
            modified_at: wire.modified_at,
        };
        employee.validate()?;
        Ok(employee)
    }
}

#[cfg(test)]
mod tests {
    use super::{Employee, EmployeeValidationError, Gender, PhoneNumber};
    use chrono::NaiveDate;

    #[test]
    fn gender_codes_roundtrip() {
        for gender in [Gender::Male, Gender::Female] {
            assert_eq!(Gender::from_code(gender.code()), Some(gender));
        }
        assert_eq!(Gender::from_code('x'), None);
        assert_eq!(Gender::from_code('m'), None);
    }

    #[test]
    fn birthdate_today_is_not_in_the_past() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut employee = Employee::new("123-45-6789", "Ada", "Lovelace");
        employee.birthdate = Some(today);
        assert!(matches!(
            employee.validate_at(today),
            Err(EmployeeValidationError::BirthdateNotInPast { .. })
        ));

        employee.birthdate = today.pred_opt();
        assert!(employee.validate_at(today).is_ok());
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let mut employee = Employee::new("123-45-6789", "Ada", "Lovelace");
        employee.age = 125;
        assert!(employee.validate().is_ok());
        employee.age = 126;
        assert_eq!(
            employee.validate(),
            Err(EmployeeValidationError::AgeOutOfRange(126))
        );
        employee.age = -1;
        assert_eq!(
            employee.validate(),
            Err(EmployeeValidationError::AgeOutOfRange(-1))
        );
    }

    #[test]
    fn email_shape_is_checked_only_when_present() {
        let mut employee = Employee::new("123-45-6789", "Ada", "Lovelace");
        assert!(employee.validate().is_ok());
        employee.email = Some("ada@example.org".to_string());
        assert!(employee.validate().is_ok());
        employee.email = Some("ada at example".to_string());
        assert_eq!(
            employee.validate(),
            Err(EmployeeValidationError::MalformedEmail)
        );
    }

    #[test]
    fn pushing_a_detached_phone_directly_fails_validation() {
        let mut employee = Employee::new("123-45-6789", "Ada", "Lovelace");
        let phone = PhoneNumber::new("work", "555-0100");
        let phone_id = phone.id;
        employee.phone_numbers.push(phone);
        assert_eq!(
            employee.validate(),
            Err(EmployeeValidationError::ForeignPhoneNumber {
                phone_id,
                owner_id: None
            })
        );
    }

    #[test]
    fn display_name_skips_missing_parts() {
        let mut employee = Employee::with_id(1, "123-45-6789").unwrap();
        assert_eq!(employee.display_name(), "");
        employee.last_name = Some("Hopper".to_string());
        assert_eq!(employee.display_name(), "Hopper");
    }
}
