use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::task::{Task, TaskPriority, TaskRef, TaskStatus};
use crate::models::user::UserSummary;
use crate::response::Page;
use crate::validation::{double_option, Validate, Validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TaskSort {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Position,
    Title,
}

impl TaskSort {
    pub fn column(self) -> &'static str {
        match self {
            TaskSort::CreatedAt => "t.created_at",
            TaskSort::DueDate => "t.due_date",
            TaskSort::Priority => "t.priority",
            TaskSort::Position => "t.position",
            TaskSort::Title => "t.title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub project_id: Option<i32>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<i32>,
    pub search: Option<String>,
    pub sort_by: Option<TaskSort>,
    pub sort_order: Option<SortOrder>,
}

impl TaskListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }

    /// `ORDER BY` clause built only from whitelisted columns; ties break on id.
    pub fn order_by(&self) -> String {
        let sort = self.sort_by.unwrap_or_default();
        let order = self.sort_order.unwrap_or_default();
        format!(" ORDER BY {} {} NULLS LAST, t.id {}", sort.column(), order.sql(), order.sql())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: i32,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Validate for CreateTaskRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("title", &self.title, 1, 200)
            .optional_text("description", self.description.as_deref(), 0, 5000)
            .positive("projectId", self.project_id)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub position: Option<i32>,
}

impl Validate for UpdateTaskRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .optional_text("title", self.title.as_deref(), 1, 200)
            .optional_text(
                "description",
                self.description.as_ref().and_then(|d| d.as_deref()),
                0,
                5000,
            )
            .check(
                self.position.map_or(true, |p| p >= 0),
                "position",
                "Position must not be negative",
            )
            .finish()
    }
}

impl UpdateTaskRequest {
    /// The assignee the update sets, if it sets one.
    pub fn new_assignee(&self) -> Option<i32> {
        self.assignee_id.flatten()
    }

    pub fn apply(self, mut task: Task) -> Task {
        if let Some(title) = self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
        task
    }
}

/// Kanban move: change column and optionally the slot within it.
#[derive(Deserialize)]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
    pub position: Option<i32>,
}

impl Validate for MoveTaskRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check(
                self.position.map_or(true, |p| p >= 0),
                "position",
                "Position must not be negative",
            )
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDependencyRequest {
    pub depends_on_id: i32,
}

impl Validate for AddDependencyRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .positive("dependsOnId", self.depends_on_id)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

impl Validate for CommentRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("content", &self.content, 1, 2000)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub assignee: Option<UserSummary>,
    pub creator: UserSummary,
    pub comment_count: i64,
    pub dependencies: Vec<TaskRef>,
    pub dependents: Vec<TaskRef>,
}

#[derive(Serialize)]
pub struct DependencyList {
    pub dependencies: Vec<TaskRef>,
    pub dependents: Vec<TaskRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTask {
    pub id: i32,
    pub project_id: i32,
}
