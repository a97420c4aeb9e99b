use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Role tags the application distinguishes. Role records carry free-form
/// names; anything outside this set is treated as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleTag {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "menejer")]
    Manager,
    #[serde(rename = "oshpaz")]
    Cook,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl RoleTag {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => RoleTag::Admin,
            "menejer" | "manager" => RoleTag::Manager,
            "oshpaz" | "cook" => RoleTag::Cook,
            _ => RoleTag::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Admin => "admin",
            RoleTag::Manager => "menejer",
            RoleTag::Cook => "oshpaz",
            RoleTag::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

impl Role {
    pub fn tag(&self) -> RoleTag {
        RoleTag::from_name(&self.name)
    }
}

/// The authenticated principal and the user records of the users screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(default, with = "super::timestamp::option")]
    pub last_login: Option<NaiveDateTime>,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn role_tag(&self) -> RoleTag {
        self.role.tag()
    }
}

/// Embedded `{username, full_name}` reference used across many records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub username: String,
    pub full_name: String,
    pub password: String,
    pub role_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
