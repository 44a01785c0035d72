use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request bodies implement this to be accepted through [`ValidJson`].
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// Collects field errors and turns them into a single `AppError::Validation`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        if len < min {
            if min <= 1 {
                self.errors.push(FieldError::new(field, format!("{} is required", field)));
            } else {
                self.errors.push(FieldError::new(
                    field,
                    format!("{} must be at least {} characters", field, min),
                ));
            }
        } else if len > max {
            self.errors.push(FieldError::new(
                field,
                format!("{} must be at most {} characters", field, max),
            ));
        }
        self
    }

    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
    ) -> &mut Self {
        if let Some(value) = value {
            self.text(field, value, min, max);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = is_email(value);
        self.check(ok, field, "Email must be a valid email address")
    }

    pub fn username(&mut self, field: &str, value: &str) -> &mut Self {
        let len = value.chars().count();
        let ok = (3..=30).contains(&len)
            && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        self.check(
            ok,
            field,
            "Username must be 3-30 characters of letters, digits or underscores",
        )
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = value.chars().count() >= 8
            && value.chars().any(|c| c.is_ascii_alphabetic())
            && value.chars().any(|c| c.is_ascii_digit());
        self.check(
            ok,
            field,
            "Password must be at least 8 characters and contain a letter and a digit",
        )
    }

    pub fn positive(&mut self, field: &str, value: i32) -> &mut Self {
        self.check(value > 0, field, "Must be a positive id")
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(
                "Validation failed",
                std::mem::take(&mut self.errors),
            ))
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

/// JSON body extractor that runs [`Validate`] before the handler sees the value.
pub struct ValidJson<T>(pub T);

impl<T> ValidJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromRequest for ValidJson<T>
where
    T: DeserializeOwned + Validate + 'static,
{
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Json::<T>::from_request(req, payload);
        Box::pin(async move {
            let web::Json(value) = body.await?;
            value.validate()?;
            Ok(ValidJson(value))
        })
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
