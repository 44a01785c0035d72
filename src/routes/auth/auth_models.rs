use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::user::PublicUser;
use crate::validation::{Validate, Validator};

// Registration request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .email("email", &self.email)
            .username("username", &self.username)
            .password("password", &self.password)
            .optional_text("firstName", self.first_name.as_deref(), 1, 50)
            .optional_text("lastName", self.last_name.as_deref(), 1, 50)
            .finish()
    }
}

// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .email("email", &self.email)
            .text("password", &self.password, 1, 128)
            .finish()
    }
}

// Refresh and logout requests carry the opaque refresh token
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("refreshToken", &self.refresh_token, 1, 256)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .text("currentPassword", &self.current_password, 1, 128)
            .password("newPassword", &self.new_password)
            .check(
                self.current_password != self.new_password,
                "newPassword",
                "New password must differ from the current password",
            )
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_reports_each_bad_field() {
        let request = RegisterRequest {
            email: "not-an-email".into(),
            username: "x".into(),
            password: "password".into(),
            first_name: None,
            last_name: Some("".into()),
        };

        match request.validate().unwrap_err() {
            AppError::Validation { errors, .. } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "username", "password", "lastName"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn new_password_must_change() {
        let request = ChangePasswordRequest {
            current_password: "abcd1234".into(),
            new_password: "abcd1234".into(),
        };
        assert!(request.validate().is_err());
    }
}
