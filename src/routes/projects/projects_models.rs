use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::project::{Project, ProjectStatus};
use crate::models::project_member::MemberDetail;
use crate::models::user::UserSummary;
use crate::response::Page;
use crate::validation::{double_option, Validate, Validator};

#[derive(Deserialize)]
pub struct ProjectListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

impl ProjectListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

fn dates_ordered(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Validate for CreateProjectRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("name", &self.name, 1, 100)
            .optional_text("description", self.description.as_deref(), 0, 2000)
            .check(
                dates_ordered(self.start_date, self.end_date),
                "endDate",
                "End date must not be before start date",
            )
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
}

impl Validate for UpdateProjectRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut validator = Validator::new();
        validator
            .optional_text("name", self.name.as_deref(), 1, 100)
            .optional_text(
                "description",
                self.description.as_ref().and_then(|d| d.as_deref()),
                0,
                2000,
            );
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            validator.check(
                dates_ordered(start, end),
                "endDate",
                "End date must not be before start date",
            );
        }
        validator.finish()
    }
}

impl UpdateProjectRequest {
    /// Applies the present fields on top of `project`.
    pub fn apply(self, mut project: Project) -> Result<Project, AppError> {
        if let Some(name) = self.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            project.end_date = end_date;
        }
        Validator::new()
            .check(
                dates_ordered(project.start_date, project.end_date),
                "endDate",
                "End date must not be before start date",
            )
            .finish()?;
        Ok(project)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: i32,
    pub role: Option<String>,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .positive("userId", self.user_id)
            .optional_text("role", self.role.as_deref(), 1, 30)
            .finish()
    }
}

#[derive(Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub owner: UserSummary,
    pub members: Vec<MemberDetail>,
}
