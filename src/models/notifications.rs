use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::auth::UserSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub notification_type_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    pub is_read: bool,
    #[serde(with = "super::timestamp")]
    pub created_at: NaiveDateTime,
}
