//! Fixtures shared by the cells' integration tests.

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};

use shared_config::AppConfig;
use shared_database::{AppState, Database};
use shared_models::auth::{User, UserType};

use crate::jwt::issue_token;

pub const FIXTURE_PASSWORD_HASH: &str = "fixture-password-hash";

pub struct TestConfig {
    pub jwt_secret: String,
    pub default_staff_password: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            default_staff_password: "password".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_path: ":memory:".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: 24,
            default_staff_password: self.default_staff_password.clone(),
            server_port: 0,
            admin_email: None,
            admin_password: None,
        }
    }

    /// Router state backed by a fresh in-memory database.
    pub fn to_state(&self) -> AppState {
        let db = Database::open_in_memory().expect("in-memory database");
        AppState::new(self.to_app_config(), db)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user_id: i64, user_type: UserType, secret: &str) -> String {
        let user = User {
            id: user_id,
            email: Some(format!("user{}@bloodbank.test", user_id)),
            user_type,
            created_at: Some(Utc::now()),
        };
        issue_token(&user, secret, 24).expect("token")
    }

    pub fn bearer(user_id: i64, user_type: UserType, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user_id, user_type, secret))
    }

    pub fn create_expired_token(user_id: i64, user_type: UserType, secret: &str) -> String {
        let user = User {
            id: user_id,
            email: None,
            user_type,
            created_at: None,
        };
        issue_token(&user, secret, -1).expect("token")
    }
}

pub struct Fixtures;

impl Fixtures {
    pub fn blood_group_id(conn: &Connection, name: &str) -> i64 {
        conn.query_row("SELECT id FROM blood_groups WHERE name = ?1", [name], |row| row.get(0))
            .expect("seeded blood group")
    }

    pub fn user(conn: &Connection, email: &str, user_type: UserType) -> i64 {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (name, email, password_hash, user_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![email, email, FIXTURE_PASSWORD_HASH, user_type, now],
        )
        .expect("insert user");
        conn.last_insert_rowid()
    }

    pub fn donor(conn: &Connection, email: &str, blood_group: &str, date_of_birth: NaiveDate) -> i64 {
        let now = Utc::now();
        let blood_group_id = Self::blood_group_id(conn, blood_group);
        conn.execute(
            "INSERT INTO users (name, email, password_hash, user_type, first_name, last_name,
                                date_of_birth, gender, blood_group_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'donor', ?4, ?5, ?6, 'female', ?7, ?8, ?8)",
            params![
                format!("Test Donor {}", email),
                email,
                FIXTURE_PASSWORD_HASH,
                "Test",
                "Donor",
                date_of_birth,
                blood_group_id,
                now
            ],
        )
        .expect("insert donor");
        conn.last_insert_rowid()
    }

    /// Returns `(hospital_id, staff_user_id)`.
    pub fn hospital(conn: &Connection, name: &str) -> (i64, i64) {
        Self::institution(conn, "hospitals", UserType::HospitalStaff, name)
    }

    /// Returns `(blood_center_id, staff_user_id)`.
    pub fn blood_center(conn: &Connection, name: &str) -> (i64, i64) {
        Self::institution(conn, "blood_centers", UserType::CenterStaff, name)
    }

    pub fn recipient(conn: &Connection, hospital_id: i64, name: &str, blood_group: &str) -> i64 {
        let now = Utc::now();
        let blood_group_id = Self::blood_group_id(conn, blood_group);
        conn.execute(
            "INSERT INTO recipients (hospital_id, name, blood_group_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![hospital_id, name, blood_group_id, now],
        )
        .expect("insert recipient");
        conn.last_insert_rowid()
    }

    pub fn adult_birth_date() -> NaiveDate {
        Utc::now().date_naive() - Duration::days(30 * 365)
    }

    fn institution(conn: &Connection, table: &str, user_type: UserType, name: &str) -> (i64, i64) {
        let slug: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let email = format!("{}@{}.test", slug, table);
        let user_id = Self::user(conn, &email, user_type);
        let now = Utc::now();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, name, email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                table
            ),
            params![user_id, name, email, now],
        )
        .expect("insert institution");
        (conn.last_insert_rowid(), user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;
    use crate::scope::{resolve_scope, Scope};
    use assert_matches::assert_matches;
    use shared_models::error::AppError;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default().to_app_config();
        assert!(config.is_configured());
        assert_eq!(config.default_staff_password, "password");
    }

    #[test]
    fn test_jwt_token_creation() {
        let secret = TestConfig::default().jwt_secret;
        let token = JwtTestUtils::create_test_token(7, UserType::Donor, &secret);
        let user = validate_token(&token, &secret).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.user_type, UserType::Donor);
    }

    #[test]
    fn test_scope_resolves_staff_institution() {
        let db = Database::open_in_memory().unwrap();
        let (hospital_id, staff_id) = Fixtures::hospital(db.conn(), "St. Mary's");
        let (center_id, center_staff_id) = Fixtures::blood_center(db.conn(), "Central Center");

        let staff = User { id: staff_id, email: None, user_type: UserType::HospitalStaff, created_at: None };
        let scope = resolve_scope(db.conn(), &staff).unwrap();
        assert_eq!(scope, Scope::Hospital(hospital_id));
        assert!(scope.ensure_hospital(hospital_id).is_ok());
        assert_matches!(scope.ensure_hospital(hospital_id + 1), Err(AppError::Forbidden(_)));

        let center = User { id: center_staff_id, email: None, user_type: UserType::CenterStaff, created_at: None };
        assert_eq!(resolve_scope(db.conn(), &center).unwrap(), Scope::BloodCenter(center_id));
    }

    #[test]
    fn test_unlinked_staff_is_forbidden() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Fixtures::user(db.conn(), "orphan@bloodbank.test", UserType::HospitalStaff);
        let orphan = User { id: user_id, email: None, user_type: UserType::HospitalStaff, created_at: None };
        assert_matches!(resolve_scope(db.conn(), &orphan), Err(AppError::Forbidden(_)));
    }
}
