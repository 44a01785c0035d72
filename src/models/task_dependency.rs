use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    pub id: i32,
    pub task_id: i32,
    pub depends_on_id: i32,
    pub created_at: DateTime<Utc>,
}
