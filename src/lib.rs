use actix_web::{error as web_error, web, HttpRequest};

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod notifier;
pub mod realtime;
pub mod response;
pub mod routes;
pub mod validation;

use crate::error::AppError;
use crate::routes::health::health_handlers;
use crate::routes::routes as api;
use crate::validation::FieldError;

fn json_error(err: web_error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(
        "Invalid request body",
        vec![FieldError::new("body", err.to_string())],
    )
    .into()
}

fn query_error(err: web_error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(
        "Invalid query parameters",
        vec![FieldError::new("query", err.to_string())],
    )
    .into()
}

fn path_error(err: web_error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::validation(
        "Invalid path parameter",
        vec![FieldError::new("path", err.to_string())],
    )
    .into()
}

/// Registers extractor error handlers and every API scope. Shared by the
/// server and the integration tests.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .configure(api::health_configure)
        .configure(api::auth_configure)
        .configure(api::users_configure)
        .configure(api::projects_configure)
        .configure(api::tasks_configure)
        .configure(api::notifications_configure)
        .configure(api::dashboard_configure)
        .configure(api::realtime_configure)
        .default_service(web::to(health_handlers::route_not_found));
}
