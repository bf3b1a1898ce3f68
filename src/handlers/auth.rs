use axum::{extract::State, response::Json};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::extractors::{AdminPrincipal, ApiJson};
use crate::models::{LoginRequest, LoginResponse, VerifyResponse};
use crate::utils::validation::{non_blank, ValidationError};

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = non_blank(request.email);
    let password = request.password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ValidationError::MissingCredentials.into());
    };

    let (token, admin) = state.auth.authenticate(state.store.as_ref(), &email, &password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        admin,
    }))
}

pub async fn verify(AdminPrincipal(admin): AdminPrincipal) -> Json<VerifyResponse> {
    Json(VerifyResponse { valid: true, admin })
}
