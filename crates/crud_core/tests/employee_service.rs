use crud_core::db::open_db_in_memory;
use crud_core::{
    Employee, EmployeeId, EmployeeService, EmployeeServiceError, SqliteEmployeeRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> EmployeeService<SqliteEmployeeRepository<'_>> {
    EmployeeService::new(SqliteEmployeeRepository::try_new(conn).unwrap())
}

fn hire(service: &EmployeeService<SqliteEmployeeRepository<'_>>, index: u32) -> Employee {
    let employee = Employee::new(format!("000-00-{index:04}"), "Worker", format!("No{index}"));
    service.hire(&employee).unwrap()
}

fn manager_of(
    service: &EmployeeService<SqliteEmployeeRepository<'_>>,
    id: EmployeeId,
) -> Option<EmployeeId> {
    service.get(id).unwrap().unwrap().manager_id
}

#[test]
fn hire_returns_stored_state() {
    let conn = setup();
    let service = service(&conn);

    let mut draft = Employee::new("100-00-0001", "Ada", "Lovelace");
    draft.age = 36;
    draft.salary = 1_000.0;
    let hired = service.hire(&draft).unwrap();

    assert_eq!(hired.id, draft.id);
    assert_eq!(hired.version, 1);
    assert_eq!(hired.age, 36);
    assert!(hired.created_at.is_some());
    assert_eq!(service.get(draft.id).unwrap(), Some(hired));
    assert_eq!(service.count().unwrap(), 1);
}

#[test]
fn hire_rejects_unknown_manager() {
    let conn = setup();
    let service = service(&conn);

    let mut draft = Employee::new("100-00-0002", "No", "Boss");
    draft.manager_id = Some(99);
    assert!(matches!(
        service.hire(&draft),
        Err(EmployeeServiceError::ManagerNotFound(99))
    ));
}

#[test]
fn update_returns_new_version() {
    let conn = setup();
    let service = service(&conn);

    let mut employee = hire(&service, 1);
    employee.email = Some("worker@example.com".to_string());
    let updated = service.update(&employee).unwrap();

    assert_eq!(updated.version, 2);
    assert_eq!(updated.email.as_deref(), Some("worker@example.com"));
}

#[test]
fn assign_manager_links_both_sides() {
    let conn = setup();
    let service = service(&conn);
    let manager = hire(&service, 1);
    let report = hire(&service, 2);

    let updated = service.assign_manager(manager.id, report.id).unwrap();
    assert_eq!(updated.manager_id, Some(manager.id));

    let manager = service.get(manager.id).unwrap().unwrap();
    assert_eq!(manager.managed_employee_ids, vec![report.id]);

    let again = service.assign_manager(manager.id, report.id).unwrap();
    assert_eq!(again.version, updated.version);
}

#[test]
fn reassigning_detaches_from_previous_manager() {
    let conn = setup();
    let service = service(&conn);
    let first = hire(&service, 1);
    let second = hire(&service, 2);
    let report = hire(&service, 3);

    service.assign_manager(first.id, report.id).unwrap();
    service.assign_manager(second.id, report.id).unwrap();

    assert_eq!(manager_of(&service, report.id), Some(second.id));
    let first = service.get(first.id).unwrap().unwrap();
    let second = service.get(second.id).unwrap().unwrap();
    assert!(first.managed_employee_ids.is_empty());
    assert_eq!(second.managed_employee_ids, vec![report.id]);
}

#[test]
fn assign_manager_rejects_self_and_cycles() {
    let conn = setup();
    let service = service(&conn);
    let a = hire(&service, 1);
    let b = hire(&service, 2);
    let c = hire(&service, 3);

    assert!(matches!(
        service.assign_manager(a.id, a.id),
        Err(EmployeeServiceError::SelfManagement(id)) if id == a.id
    ));

    service.assign_manager(a.id, b.id).unwrap();
    service.assign_manager(b.id, c.id).unwrap();

    match service.assign_manager(c.id, a.id) {
        Err(EmployeeServiceError::ManagementCycle {
            manager_id,
            report_id,
        }) => {
            assert_eq!(manager_id, c.id);
            assert_eq!(report_id, a.id);
        }
        other => panic!("expected management cycle, got {other:?}"),
    }
    assert_eq!(manager_of(&service, a.id), None);
}

#[test]
fn assign_manager_reports_missing_parties() {
    let conn = setup();
    let service = service(&conn);
    let existing = hire(&service, 1);

    assert!(matches!(
        service.assign_manager(42, existing.id),
        Err(EmployeeServiceError::ManagerNotFound(42))
    ));
    assert!(matches!(
        service.assign_manager(existing.id, 43),
        Err(EmployeeServiceError::EmployeeNotFound(43))
    ));
}

#[test]
fn unassign_manager_clears_relation() {
    let conn = setup();
    let service = service(&conn);
    let manager = hire(&service, 1);
    let report = hire(&service, 2);
    service.assign_manager(manager.id, report.id).unwrap();

    let updated = service.unassign_manager(report.id).unwrap();
    assert_eq!(updated.manager_id, None);
    let manager = service.get(manager.id).unwrap().unwrap();
    assert!(manager.managed_employee_ids.is_empty());

    let unchanged = service.unassign_manager(report.id).unwrap();
    assert_eq!(unchanged.version, updated.version);
}

#[test]
fn phone_numbers_are_added_and_removed() {
    let conn = setup();
    let service = service(&conn);
    let employee = hire(&service, 1);

    let phone = service
        .add_phone_number(employee.id, "work", "555-0100")
        .unwrap();
    assert_eq!(phone.owner_id, Some(employee.id));
    let stored = service.get(employee.id).unwrap().unwrap();
    assert_eq!(stored.phone_numbers, vec![phone.clone()]);

    let removed = service.remove_phone_number(employee.id, phone.id).unwrap();
    assert_eq!(removed.id, phone.id);
    assert_eq!(removed.owner_id, None);
    assert!(service
        .get(employee.id)
        .unwrap()
        .unwrap()
        .phone_numbers
        .is_empty());

    match service.remove_phone_number(employee.id, phone.id) {
        Err(EmployeeServiceError::PhoneNumberNotFound {
            employee_id,
            phone_id,
        }) => {
            assert_eq!(employee_id, employee.id);
            assert_eq!(phone_id, phone.id);
        }
        other => panic!("expected missing phone number, got {other:?}"),
    }
}

#[test]
fn responsibilities_round_trip_through_storage() {
    let conn = setup();
    let service = service(&conn);
    let employee = hire(&service, 1);

    service.add_responsibility(employee.id, "hiring").unwrap();
    let updated = service.add_responsibility(employee.id, "budget").unwrap();
    assert_eq!(updated.responsibilities, vec!["hiring", "budget"]);

    let updated = service.remove_responsibility(employee.id, "hiring").unwrap();
    assert_eq!(updated.responsibilities, vec!["budget"]);

    let unchanged = service.remove_responsibility(employee.id, "payroll").unwrap();
    assert_eq!(unchanged.version, updated.version);
}

#[test]
fn list_page_applies_default_limit_and_offset() {
    let conn = setup();
    let service = service(&conn);
    let hired: Vec<EmployeeId> = (0..12).map(|index| hire(&service, index).id).collect();

    let page = service.list_page(None, 0).unwrap();
    assert_eq!(page.applied_limit, 10);
    assert_eq!(page.total, 12);
    let ids: Vec<_> = page.items.iter().map(|employee| employee.id).collect();
    assert_eq!(ids, hired[..10].to_vec());

    let rest = service.list_page(None, 10).unwrap();
    assert_eq!(rest.items.len(), 2);
    assert_eq!(rest.total, 12);

    let capped = service.list_page(Some(500), 0).unwrap();
    assert_eq!(capped.applied_limit, 50);
    assert_eq!(capped.items.len(), 12);
}

#[test]
fn search_by_name_treats_missing_parts_as_wildcards() {
    let conn = setup();
    let service = service(&conn);
    let alice = service
        .hire(&Employee::new("200-00-0001", "Alice", "Smith"))
        .unwrap();
    let bob = service
        .hire(&Employee::new("200-00-0002", "Bob", "Smith"))
        .unwrap();
    service
        .hire(&Employee::new("200-00-0003", "Alice", "Jones"))
        .unwrap();

    let smiths: Vec<_> = service
        .search_by_name(None, Some("Smith"))
        .unwrap()
        .into_iter()
        .map(|employee| employee.id)
        .collect();
    assert_eq!(smiths, vec![alice.id, bob.id]);

    assert_eq!(service.search_by_name(Some(" "), None).unwrap().len(), 3);
    assert_eq!(service.count_by_name(Some("Alice"), None).unwrap(), 2);
    assert_eq!(service.count_by_name(Some("Al%"), Some("Jo%")).unwrap(), 1);
}

#[test]
fn terminate_removes_employee_and_frees_reports() {
    let conn = setup();
    let service = service(&conn);
    let manager = hire(&service, 1);
    let report = hire(&service, 2);
    service.assign_manager(manager.id, report.id).unwrap();

    service.terminate(manager.id).unwrap();

    assert_eq!(service.get(manager.id).unwrap(), None);
    assert_eq!(manager_of(&service, report.id), None);
    assert!(matches!(
        service.terminate(manager.id),
        Err(EmployeeServiceError::EmployeeNotFound(id)) if id == manager.id
    ));
}

#[test]
fn picture_is_stored_and_loaded_separately() {
    let conn = setup();
    let service = service(&conn);
    let employee = hire(&service, 1);

    assert_eq!(service.load_picture(employee.id).unwrap(), None);
    service
        .store_picture(employee.id, Some(&[0xff, 0xd8, 0xff][..]))
        .unwrap();
    assert_eq!(
        service.load_picture(employee.id).unwrap(),
        Some(vec![0xff, 0xd8, 0xff])
    );
    assert_eq!(service.get(employee.id).unwrap().unwrap().picture, None);
    assert!(matches!(
        service.load_picture(7),
        Err(EmployeeServiceError::EmployeeNotFound(7))
    ));
}

#[test]
fn update_rejects_manager_changes_that_form_a_cycle() {
    let conn = setup();
    let service = service(&conn);
    let a = hire(&service, 1);
    let b = hire(&service, 2);
    service.assign_manager(a.id, b.id).unwrap();

    let mut a = service.get(a.id).unwrap().unwrap();
    a.manager_id = Some(b.id);
    match service.update(&a) {
        Err(EmployeeServiceError::ManagementCycle {
            manager_id,
            report_id,
        }) => {
            assert_eq!(manager_id, b.id);
            assert_eq!(report_id, a.id);
        }
        other => panic!("expected management cycle, got {other:?}"),
    }
    assert_eq!(manager_of(&service, a.id), None);

    let c = hire(&service, 3);
    let assigned = service.assign_manager(b.id, c.id).unwrap();
    assert_eq!(assigned.manager_id, Some(b.id));
}

#[test]
fn update_checks_new_manager_like_assign_manager() {
    let conn = setup();
    let service = service(&conn);
    let a = hire(&service, 1);
    let b = hire(&service, 2);

    let mut a = service.get(a.id).unwrap().unwrap();
    a.manager_id = Some(a.id);
    assert!(matches!(
        service.update(&a),
        Err(EmployeeServiceError::SelfManagement(id)) if id == a.id
    ));

    a.manager_id = Some(77);
    assert!(matches!(
        service.update(&a),
        Err(EmployeeServiceError::ManagerNotFound(77))
    ));

    a.manager_id = Some(b.id);
    let updated = service.update(&a).unwrap();
    assert_eq!(updated.manager_id, Some(b.id));
    let b = service.get(b.id).unwrap().unwrap();
    assert_eq!(b.managed_employee_ids, vec![a.id]);
}

#[test]
fn wildcard_search_skips_employees_without_names() {
    let conn = setup();
    let service = service(&conn);
    let named = hire(&service, 1);
    let unnamed = Employee::with_id(crud_core::model::flake::next_id(), "300-00-0001").unwrap();
    service.hire(&unnamed).unwrap();

    let found: Vec<_> = service
        .search_by_name(None, None)
        .unwrap()
        .into_iter()
        .map(|employee| employee.id)
        .collect();
    assert_eq!(found, vec![named.id]);
    assert_eq!(service.count_by_name(None, None).unwrap(), 1);
    assert_eq!(service.count().unwrap(), 2);
}
