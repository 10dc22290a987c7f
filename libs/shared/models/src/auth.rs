use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sql_text_enum;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub user_type: Option<UserType>,
    pub iat: Option<u64>,
}

/// Account kinds. Hospital and center staff accounts are created alongside
/// the hospital or blood center they belong to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Donor,
    HospitalStaff,
    CenterStaff,
    Customer,
    #[serde(alias = "admin")]
    System,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Donor => "donor",
            UserType::HospitalStaff => "hospital_staff",
            UserType::CenterStaff => "center_staff",
            UserType::Customer => "customer",
            UserType::System => "system",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(UserType::Donor),
            "hospital_staff" => Ok(UserType::HospitalStaff),
            "center_staff" => Ok(UserType::CenterStaff),
            "customer" => Ok(UserType::Customer),
            "system" | "admin" => Ok(UserType::System),
            other => Err(format!("unknown user type: {}", other)),
        }
    }
}

sql_text_enum!(UserType);

/// Authenticated principal, placed in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: Option<String>,
    pub user_type: UserType,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_system(&self) -> bool {
        self.user_type == UserType::System
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: i64,
    pub email: Option<String>,
    pub user_type: UserType,
}
