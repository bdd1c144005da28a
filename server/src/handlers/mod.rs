use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod events;
pub mod orders;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticketing-api",
    };

    success(payload, "Health check successful")
}

pub async fn root() -> &'static str {
    "API is running..."
}
