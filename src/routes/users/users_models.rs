use serde::Deserialize;

use crate::error::AppError;
use crate::models::user::Role;
use crate::response::Page;
use crate::validation::{Validate, Validator};

#[derive(Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl UserListQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        let mut validator = Validator::new();
        if let Some(email) = &self.email {
            validator.email("email", email);
        }
        if let Some(username) = &self.username {
            validator.username("username", username);
        }
        validator
            .optional_text("firstName", self.first_name.as_deref(), 1, 50)
            .optional_text("lastName", self.last_name.as_deref(), 1, 50)
            .finish()
    }
}
