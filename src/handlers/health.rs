use crate::handlers::version::SERVICE_NAME;
use crate::models::HealthResponse;
use crate::utils::time;
use axum::{http::StatusCode, response::Json};

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: time::now(),
    };

    (StatusCode::OK, Json(response))
}
