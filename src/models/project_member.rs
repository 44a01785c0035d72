use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_id: i32,
    pub user_id: i32,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Membership row joined with the member's user record.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}
