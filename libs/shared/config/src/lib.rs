use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub default_staff_password: String,
    pub server_port: u16,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_PATH not set, using bloodbank.db");
                    "bloodbank.db".to_string()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            default_staff_password: env::var("DEFAULT_STAFF_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("DEFAULT_STAFF_PASSWORD not set, using default");
                    "password".to_string()
                }),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_path.is_empty() && !self.jwt_secret.is_empty()
    }

    /// Both admin credentials must be present for the bootstrap account to be created.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            database_path: ":memory:".to_string(),
            jwt_secret: "secret".to_string(),
            token_ttl_hours: 24,
            default_staff_password: "password".to_string(),
            server_port: 3000,
            admin_email: None,
            admin_password: None,
        }
    }

    #[test]
    fn test_is_configured_requires_secret() {
        let mut config = config();
        assert!(config.is_configured());

        config.jwt_secret.clear();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_admin_credentials_need_both_values() {
        let mut config = config();
        config.admin_email = Some("admin@bloodbank.test".to_string());
        assert!(config.admin_credentials().is_none());

        config.admin_password = Some("secret".to_string());
        assert_eq!(config.admin_credentials(), Some(("admin@bloodbank.test", "secret")));
    }
}
