use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::extractors::{ApiJson, ApiPath, MaybeAdmin};
use crate::models::{AddCommentRequest, Comment, CommentResponse};
use crate::services::comment_service;

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = comment_service::list_comments(state.store.as_ref(), id).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    MaybeAdmin(admin): MaybeAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<AddCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = comment_service::add_comment(state.store.as_ref(), id, request, admin.as_ref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment added successfully".to_string(),
            comment,
        }),
    ))
}
