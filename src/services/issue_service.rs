use crate::database::IssueStore;
use crate::error::ApiError;
use crate::models::{
    Category, Issue, IssueDetail, IssueFilter, IssueListQuery, IssueStatus, IssueSummary, NewIssue,
    Statistics,
};
use crate::services::notification_service;
use crate::services::photo_storage::{PhotoStore, PhotoUpload};
use crate::utils::time;
use crate::utils::validation::{non_blank, ValidationError};

/// Raw fields of an issue submission, as received from the form.
#[derive(Debug, Default)]
pub struct IssueSubmission {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub reporter_name: Option<String>,
    pub reporter_email: Option<String>,
    pub reporter_phone: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Turns listing query parameters into a filter. Blank parameters impose no
/// constraint; unknown category or status values are rejected.
pub fn build_filter(query: IssueListQuery) -> Result<IssueFilter, ValidationError> {
    Ok(IssueFilter {
        search: non_blank(query.search),
        category: non_blank(query.category).map(|c| c.parse::<Category>()).transpose()?,
        status: non_blank(query.status).map(|s| s.parse::<IssueStatus>()).transpose()?,
    })
}

pub async fn list_issues(store: &dyn IssueStore, filter: &IssueFilter) -> Result<Vec<IssueSummary>, ApiError> {
    let records = store
        .list_issues(filter)
        .await
        .map_err(ApiError::internal("Failed to fetch issues"))?;
    Ok(records.into_iter().map(notification_service::annotate).collect())
}

pub async fn get_issue_detail(store: &dyn IssueStore, id: u64) -> Result<IssueDetail, ApiError> {
    let issue = store
        .get_issue(id)
        .await
        .map_err(ApiError::internal("Failed to fetch issue"))?
        .ok_or(ApiError::NotFound("Issue"))?;
    let comments = store
        .list_comments(id)
        .await
        .map_err(ApiError::internal("Failed to fetch issue"))?
        .ok_or(ApiError::NotFound("Issue"))?;
    Ok(IssueDetail { issue, comments })
}

/// Validates a submission, uploads its photo if any, then stores the issue.
/// Nothing is uploaded for an invalid submission, and an uploaded photo is
/// removed again if the issue cannot be stored.
pub async fn create_issue(
    store: &dyn IssueStore,
    photos: Option<&dyn PhotoStore>,
    submission: IssueSubmission,
) -> Result<Issue, ApiError> {
    let (Some(title), Some(description), Some(category), Some(location)) = (
        non_blank(submission.title),
        non_blank(submission.description),
        non_blank(submission.category),
        non_blank(submission.location),
    ) else {
        return Err(ValidationError::MissingIssueFields.into());
    };
    let category = category.parse::<Category>()?;

    let photo_url = match &submission.photo {
        Some(photo) => {
            photo.validate()?;
            let storage = photos.ok_or(ValidationError::PhotoUploadsDisabled)?;
            let url = storage
                .upload(photo)
                .await
                .map_err(ApiError::internal("Failed to upload photo"))?;
            Some(url)
        }
        None => None,
    };

    let new_issue = NewIssue {
        title,
        description,
        category,
        location,
        photo_url: photo_url.clone(),
        reporter_name: non_blank(submission.reporter_name),
        reporter_email: non_blank(submission.reporter_email),
        reporter_phone: non_blank(submission.reporter_phone),
    };

    match store.create_issue(new_issue, time::now()).await {
        Ok(issue) => {
            tracing::info!("Issue {} reported in {}", issue.id, issue.category);
            Ok(issue)
        }
        Err(e) => {
            if let (Some(url), Some(storage)) = (photo_url, photos) {
                if let Err(cleanup) = storage.remove(&url).await {
                    tracing::error!("Failed to remove orphaned photo {}: {:#}", url, cleanup);
                }
            }
            Err(ApiError::internal("Failed to create issue")(e))
        }
    }
}

pub async fn update_status(store: &dyn IssueStore, id: u64, status: Option<String>) -> Result<Issue, ApiError> {
    let status = status
        .as_deref()
        .ok_or(ValidationError::InvalidStatus)?
        .parse::<IssueStatus>()?;

    let issue = store
        .update_status(id, status, time::now())
        .await
        .map_err(ApiError::internal("Failed to update issue status"))?
        .ok_or(ApiError::NotFound("Issue"))?;
    tracing::info!("Issue {} moved to {}", id, status);
    Ok(issue)
}

pub async fn delete_issue(store: &dyn IssueStore, id: u64) -> Result<(), ApiError> {
    let deleted = store
        .delete_issue(id)
        .await
        .map_err(ApiError::internal("Failed to delete issue"))?;
    if !deleted {
        return Err(ApiError::NotFound("Issue"));
    }
    tracing::info!("Issue {} deleted", id);
    Ok(())
}

pub async fn statistics(store: &dyn IssueStore) -> Result<Statistics, ApiError> {
    store
        .statistics()
        .await
        .map_err(ApiError::internal("Failed to fetch statistics"))
}
