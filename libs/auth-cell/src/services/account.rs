use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_models::auth::{User, UserType};
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;
use shared_utils::password::{hash_password, verify_password};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Token error: {0}")]
    Token(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => AppError::Auth(err.to_string()),
            AccountError::NotFound => AppError::NotFound(err.to_string()),
            AccountError::Token(msg) | AccountError::Hashing(msg) => AppError::Internal(msg),
            AccountError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub phone: Option<String>,
    pub hospital_id: Option<i64>,
    pub blood_center_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

pub struct AccountService<'a> {
    config: &'a AppConfig,
}

impl<'a> AccountService<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, conn, password))]
    pub fn login(
        &self,
        conn: &Connection,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, AccountError> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE lower(email) = lower(?1)",
                [email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((user_id, password_hash)) = row else {
            debug!("Login attempt for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        // Malformed stored hashes count as a failed login rather than a server error.
        let valid = verify_password(password, &password_hash).unwrap_or_else(|e| {
            warn!("Stored password hash for user {} is unreadable: {}", user_id, e);
            false
        });
        if !valid {
            return Err(AccountError::InvalidCredentials);
        }

        let profile = self.profile(conn, user_id)?;
        let user = User {
            id: profile.id,
            email: Some(profile.email.clone()),
            user_type: profile.user_type,
            created_at: Some(profile.created_at),
        };
        let token = issue_token(&user, &self.config.jwt_secret, self.config.token_ttl_hours)
            .map_err(AccountError::Token)?;

        info!("User {} logged in as {}", user.id, user.user_type);

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl_hours * 3600,
            user: profile,
        })
    }

    pub fn profile(&self, conn: &Connection, user_id: i64) -> Result<UserProfile, AccountError> {
        conn.query_row(
            "SELECT u.id, u.name, u.email, u.user_type, u.phone, h.id, c.id, u.created_at
             FROM users u
             LEFT JOIN hospitals h ON h.user_id = u.id
             LEFT JOIN blood_centers c ON c.user_id = u.id
             WHERE u.id = ?1",
            [user_id],
            |row| {
                Ok(UserProfile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    user_type: row.get(3)?,
                    phone: row.get(4)?,
                    hospital_id: row.get(5)?,
                    blood_center_id: row.get(6)?,
                    created_at: row.get(7)?,
                })
            },
        )
        .optional()?
        .ok_or(AccountError::NotFound)
    }

    /// Create the configured system account if it does not exist yet.
    pub fn bootstrap_admin(&self, conn: &Connection) -> Result<Option<i64>, AccountError> {
        let Some((email, password)) = self.config.admin_credentials() else {
            return Ok(None);
        };

        let existing: Option<i64> = conn
            .query_row("SELECT id FROM users WHERE lower(email) = lower(?1)", [email], |row| {
                row.get(0)
            })
            .optional()?;
        if existing.is_some() {
            debug!("System account {} already present", email);
            return Ok(None);
        }

        let password_hash =
            hash_password(password).map_err(|e| AccountError::Hashing(e.to_string()))?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (name, email, password_hash, user_type, created_at, updated_at)
             VALUES ('Administrator', ?1, ?2, ?3, ?4, ?4)",
            params![email, password_hash, UserType::System, now],
        )?;

        let id = conn.last_insert_rowid();
        info!("Created system account {} ({})", id, email);
        Ok(Some(id))
    }
}
