use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::Json,
};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::extractors::{AdminPrincipal, ApiJson, ApiPath, ApiQuery};
use crate::models::{
    Issue, IssueDetail, IssueListQuery, IssueResponse, IssueSummary, MarkViewedRequest, MessageResponse, Role,
    Statistics, UpdateStatusRequest,
};
use crate::services::issue_service::{self, IssueSubmission};
use crate::services::notification_service;
use crate::services::photo_storage::PhotoUpload;
use crate::utils::validation::ValidationError;

pub async fn list_issues(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IssueListQuery>,
) -> Result<Json<Vec<IssueSummary>>, ApiError> {
    let filter = issue_service::build_filter(query)?;
    let issues = issue_service::list_issues(state.store.as_ref(), &filter).await?;
    Ok(Json(issues))
}

pub async fn get_issue(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<IssueDetail>, ApiError> {
    let detail = issue_service::get_issue_detail(state.store.as_ref(), id).await?;
    Ok(Json(detail))
}

pub async fn get_statistics(State(state): State<AppState>) -> Result<Json<Statistics>, ApiError> {
    let stats = issue_service::statistics(state.store.as_ref()).await?;
    Ok(Json(stats))
}

pub async fn create_issue(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<IssueResponse<Issue>>), ApiError> {
    let submission = read_submission(multipart?).await?;
    let issue = issue_service::create_issue(state.store.as_ref(), state.photos.as_deref(), submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            message: "Issue reported successfully".to_string(),
            issue,
        }),
    ))
}

pub async fn update_status(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<UpdateStatusRequest>,
) -> Result<Json<IssueResponse<Issue>>, ApiError> {
    let issue = issue_service::update_status(state.store.as_ref(), id, request.status).await?;
    tracing::debug!("Status of issue {} changed by {}", id, admin.email);
    Ok(Json(IssueResponse {
        message: "Status updated successfully".to_string(),
        issue,
    }))
}

pub async fn delete_issue(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<MessageResponse>, ApiError> {
    issue_service::delete_issue(state.store.as_ref(), id).await?;
    tracing::debug!("Issue {} deleted by {}", id, admin.email);
    Ok(Json(MessageResponse {
        message: "Issue deleted successfully".to_string(),
    }))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<MarkViewedRequest>,
) -> Result<Json<IssueResponse<IssueSummary>>, ApiError> {
    let viewer = request
        .viewer_type
        .as_deref()
        .and_then(Role::parse)
        .ok_or(ValidationError::InvalidViewerType)?;
    let issue = notification_service::mark_viewed(state.store.as_ref(), id, viewer).await?;
    Ok(Json(IssueResponse {
        message: "Issue marked as viewed".to_string(),
        issue,
    }))
}

/// Collects the text fields and optional photo of a new-issue form.
/// Unknown fields are ignored; an empty file input counts as no photo.
async fn read_submission(mut multipart: Multipart) -> Result<IssueSubmission, ApiError> {
    let mut submission = IssueSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            if !bytes.is_empty() {
                submission.photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let slot = match name.as_str() {
            "title" => &mut submission.title,
            "description" => &mut submission.description,
            "category" => &mut submission.category,
            "location" => &mut submission.location,
            "reporterName" => &mut submission.reporter_name,
            "reporterEmail" => &mut submission.reporter_email,
            "reporterPhone" => &mut submission.reporter_phone,
            _ => continue,
        };
        *slot = Some(field.text().await?);
    }

    Ok(submission)
}
