use crate::database::IssueStore;
use crate::error::ApiError;
use crate::models::{AddCommentRequest, Comment, NewComment, Principal, Role};
use crate::utils::time;
use crate::utils::validation::{non_blank, ValidationError};

pub async fn list_comments(store: &dyn IssueStore, issue_id: u64) -> Result<Vec<Comment>, ApiError> {
    store
        .list_comments(issue_id)
        .await
        .map_err(ApiError::internal("Failed to fetch comments"))?
        .ok_or(ApiError::NotFound("Issue"))
}

/// Appends a comment to an issue. Only a verified admin may post as `admin`,
/// and such comments are signed with the admin's own name.
pub async fn add_comment(
    store: &dyn IssueStore,
    issue_id: u64,
    request: AddCommentRequest,
    caller: Option<&Principal>,
) -> Result<Comment, ApiError> {
    let (Some(content), Some(author_type)) = (non_blank(request.content), non_blank(request.author_type)) else {
        return Err(ValidationError::MissingCommentFields.into());
    };
    let author_type = Role::parse(&author_type).ok_or(ValidationError::InvalidAuthorType)?;

    let author_name = match author_type {
        Role::Admin => caller
            .map(|admin| admin.name.clone())
            .ok_or(ApiError::Unauthorized("Admin comments require a valid admin token"))?,
        Role::Reporter => non_blank(request.author_name).ok_or(ValidationError::MissingCommentFields)?,
    };

    let comment = store
        .add_comment(
            NewComment {
                issue_id,
                content,
                author_name,
                author_type,
            },
            time::now(),
        )
        .await
        .map_err(ApiError::internal("Failed to add comment"))?
        .ok_or(ApiError::NotFound("Issue"))?;

    tracing::info!("Comment {} added to issue {} by {}", comment.id, issue_id, author_type);
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryIssueStore;
    use crate::models::{Category, NewIssue};

    async fn store_with_issue() -> (InMemoryIssueStore, u64) {
        let store = InMemoryIssueStore::new();
        let issue = store
            .create_issue(
                NewIssue {
                    title: "Pothole".to_string(),
                    description: "deep hole".to_string(),
                    category: Category::Roads,
                    location: "5th Ave".to_string(),
                    photo_url: None,
                    reporter_name: None,
                    reporter_email: None,
                    reporter_phone: None,
                },
                time::now(),
            )
            .await
            .unwrap();
        (store, issue.id)
    }

    fn request(content: &str, author_type: &str) -> AddCommentRequest {
        AddCommentRequest {
            content: Some(content.to_string()),
            author_name: Some("Resident".to_string()),
            author_type: Some(author_type.to_string()),
        }
    }

    fn admin() -> Principal {
        Principal {
            id: 1,
            email: "admin@community.com".to_string(),
            name: "System Admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reporter_comment_is_stored() {
        let (store, id) = store_with_issue().await;
        let comment = add_comment(&store, id, request(" still there ", "reporter"), None).await.unwrap();
        assert_eq!(comment.content, "still there");
        assert_eq!(comment.author_type, Role::Reporter);
        assert_eq!(list_comments(&store, id).await.unwrap(), vec![comment]);
    }

    #[tokio::test]
    async fn test_admin_comment_requires_principal() {
        let (store, id) = store_with_issue().await;
        let err = add_comment(&store, id, request("on it", "admin"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(list_comments(&store, id).await.unwrap().is_empty());

        let comment = add_comment(&store, id, request("on it", "admin"), Some(&admin())).await.unwrap();
        assert_eq!(comment.author_type, Role::Admin);
    }

    #[tokio::test]
    async fn test_admin_comment_is_signed_by_principal() {
        let (store, id) = store_with_issue().await;
        let mut impersonation = request("crew dispatched", "admin");
        impersonation.author_name = Some("Mayor".to_string());

        let comment = add_comment(&store, id, impersonation, Some(&admin())).await.unwrap();
        assert_eq!(comment.author_name, "System Admin");

        let mut unnamed = request("closing soon", "admin");
        unnamed.author_name = None;
        let comment = add_comment(&store, id, unnamed, Some(&admin())).await.unwrap();
        assert_eq!(comment.author_name, "System Admin");

        let mut anonymous = request("hello", "reporter");
        anonymous.author_name = Some(" ".to_string());
        let err = add_comment(&store, id, anonymous, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::MissingCommentFields)));
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let (store, id) = store_with_issue().await;
        let err = add_comment(&store, id, request("   ", "reporter"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::MissingCommentFields)));

        let err = add_comment(&store, id, request("hello", "mayor"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::InvalidAuthorType)));
    }

    #[tokio::test]
    async fn test_unknown_issue() {
        let (store, _) = store_with_issue().await;
        let err = add_comment(&store, 999, request("hello", "reporter"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(matches!(list_comments(&store, 999).await, Err(ApiError::NotFound(_))));
    }
}
