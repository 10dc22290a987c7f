use assert_matches::assert_matches;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use registry_cell::models::{InstitutionKind, InstitutionPayload, RegistryError};
use registry_cell::services::InstitutionService;
use shared_config::AppConfig;
use shared_database::Database;
use shared_models::auth::UserType;
use shared_utils::password::verify_password;
use shared_utils::scope::Scope;
use shared_utils::test_utils::{Fixtures, TestConfig};

fn setup() -> (Database, AppConfig) {
    let db = Database::open_in_memory().unwrap();
    (db, TestConfig::default().to_app_config())
}

fn payload(name: &str, email: &str) -> InstitutionPayload {
    InstitutionPayload {
        name: Some(name.to_string()),
        address: Some("1 Main Street".to_string()),
        phone: Some("+44 20 7946 0958".to_string()),
        email: Some(email.to_string()),
    }
}

fn staff_account(db: &Database, user_id: i64) -> Option<(String, UserType, String)> {
    db.conn()
        .query_row(
            "SELECT email, user_type, password_hash FROM users WHERE id = ?1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .unwrap()
}

#[test]
fn test_create_hospital_provisions_staff_login() {
    let (mut db, config) = setup();
    let service = InstitutionService::new(&config, InstitutionKind::Hospital);

    let hospital = service
        .create(&mut db, &Scope::System, payload("St. Mary's", "Contact@StMarys.test"))
        .unwrap();
    assert_eq!(hospital.email, "contact@stmarys.test");

    let (email, user_type, hash) = staff_account(&db, hospital.user_id).unwrap();
    assert_eq!(email, "contact@stmarys.test");
    assert_eq!(user_type, UserType::HospitalStaff);
    assert!(verify_password(&config.default_staff_password, &hash).unwrap());
}

#[test]
fn test_blood_center_staff_type() {
    let (mut db, config) = setup();
    let center = InstitutionService::new(&config, InstitutionKind::BloodCenter)
        .create(&mut db, &Scope::System, payload("Central Center", "central@centers.test"))
        .unwrap();

    let (_, user_type, _) = staff_account(&db, center.user_id).unwrap();
    assert_eq!(user_type, UserType::CenterStaff);
}

#[test]
fn test_only_system_users_create() {
    let (mut db, config) = setup();
    let (hospital_id, _) = Fixtures::hospital(db.conn(), "General Hospital");

    let result = InstitutionService::new(&config, InstitutionKind::Hospital).create(
        &mut db,
        &Scope::Hospital(hospital_id),
        payload("Other", "other@hospitals.test"),
    );
    assert_matches!(result, Err(RegistryError::Forbidden));
}

#[test]
fn test_create_rejects_taken_email_without_side_effects() {
    let (mut db, config) = setup();
    Fixtures::user(db.conn(), "taken@bloodbank.test", UserType::Donor);

    let result = InstitutionService::new(&config, InstitutionKind::Hospital).create(
        &mut db,
        &Scope::System,
        payload("St. Mary's", "taken@bloodbank.test"),
    );
    assert_matches!(result, Err(RegistryError::Validation(ref errors)) if errors.contains("email"));

    let hospitals: i64 = db
        .conn()
        .query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))
        .unwrap();
    assert_eq!(hospitals, 0);
}

#[test]
fn test_update_syncs_staff_account_and_checks_ownership() {
    let (mut db, config) = setup();
    let service = InstitutionService::new(&config, InstitutionKind::Hospital);
    let hospital = service
        .create(&mut db, &Scope::System, payload("St. Mary's", "contact@stmarys.test"))
        .unwrap();
    let (other_id, _) = Fixtures::hospital(db.conn(), "General Hospital");

    let result = service.update(
        &mut db,
        &Scope::Hospital(other_id),
        hospital.id,
        InstitutionPayload { name: Some("Renamed".to_string()), ..Default::default() },
    );
    assert_matches!(result, Err(RegistryError::Forbidden));

    let updated = service
        .update(
            &mut db,
            &Scope::Hospital(hospital.id),
            hospital.id,
            InstitutionPayload { email: Some("desk@stmarys.test".to_string()), ..Default::default() },
        )
        .unwrap();
    assert_eq!(updated.name, "St. Mary's");
    assert_eq!(updated.email, "desk@stmarys.test");

    let (email, _, _) = staff_account(&db, hospital.user_id).unwrap();
    assert_eq!(email, "desk@stmarys.test");
}

#[test]
fn test_delete_removes_staff_login() {
    let (mut db, config) = setup();
    let service = InstitutionService::new(&config, InstitutionKind::BloodCenter);
    let center = service
        .create(&mut db, &Scope::System, payload("Central Center", "central@centers.test"))
        .unwrap();

    service.delete(&mut db, &Scope::System, center.id).unwrap();

    assert!(staff_account(&db, center.user_id).is_none());
    assert_matches!(service.show(db.conn(), center.id), Err(RegistryError::NotFound(_)));
}

#[test]
fn test_delete_refused_with_history() {
    let (mut db, config) = setup();
    let hospitals = InstitutionService::new(&config, InstitutionKind::Hospital);
    let hospital = hospitals
        .create(&mut db, &Scope::System, payload("St. Mary's", "contact@stmarys.test"))
        .unwrap();
    let now = Utc::now();
    db.conn()
        .execute(
            "INSERT INTO blood_requests (hospital_id, request_date, status, created_at, updated_at)
             VALUES (?1, '2024-03-01', 'pending', ?2, ?2)",
            params![hospital.id, now],
        )
        .unwrap();

    assert_matches!(
        hospitals.delete(&mut db, &Scope::System, hospital.id),
        Err(RegistryError::InUse(_))
    );
    assert!(staff_account(&db, hospital.user_id).is_some());
}

#[test]
fn test_list_searches_by_name() {
    let (mut db, config) = setup();
    let service = InstitutionService::new(&config, InstitutionKind::Hospital);
    service
        .create(&mut db, &Scope::System, payload("St. Mary's", "contact@stmarys.test"))
        .unwrap();
    service
        .create(&mut db, &Scope::System, payload("General Hospital", "info@general.test"))
        .unwrap();

    let page = service
        .list(db.conn(), &registry_cell::models::InstitutionQuery {
            search: Some("mary".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].name, "St. Mary's");
}
