use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::extractors::AdminPrincipal;
use crate::services::export_service::{self, EXPORT_FILE_NAME};

pub async fn export_csv(
    AdminPrincipal(_admin): AdminPrincipal,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let body = export_service::export_csv(state.store.as_ref()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}
