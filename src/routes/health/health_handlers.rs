use actix_web::{HttpResponse, Responder};
use log::info;
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> impl Responder {
    info!("Received request on /api/health endpoint");
    crate::response::ok(
        "CyberTask API is running",
        HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

pub async fn route_not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::not_found("Route not found"))
}
