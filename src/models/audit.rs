use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth::UserSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub action: String,
    #[serde(default)]
    pub target_entity_type: Option<String>,
    #[serde(default)]
    pub target_entity_id: Option<i64>,
    /// SUCCESS, FAILURE, INITIATED, ...
    pub status: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub changes_before: Option<Value>,
    #[serde(default)]
    pub changes_after: Option<Value>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(with = "super::timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}
