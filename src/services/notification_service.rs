use chrono::{DateTime, Utc};

use crate::database::IssueStore;
use crate::error::ApiError;
use crate::models::{CommentStamp, Issue, IssueRecord, IssueSummary, Role, UnreadSummary};
use crate::utils::time;

/// Comments written by the other party after `watermark`. An unset watermark
/// means the viewer has never looked, so all of them are unread. A comment
/// stamped exactly at the watermark counts as read.
pub fn count_unread(comments: &[CommentStamp], viewer: Role, watermark: Option<DateTime<Utc>>) -> usize {
    comments
        .iter()
        .filter(|c| c.author_type != viewer)
        .filter(|c| watermark.map_or(true, |seen| c.created_at > seen))
        .count()
}

pub fn unread_summary(issue: &Issue, comments: &[CommentStamp]) -> UnreadSummary {
    UnreadSummary {
        unread_admin_comments: count_unread(comments, Role::Admin, issue.watermark(Role::Admin)),
        unread_reporter_comments: count_unread(comments, Role::Reporter, issue.watermark(Role::Reporter)),
        total_comments: comments.len(),
    }
}

pub fn annotate(record: IssueRecord) -> IssueSummary {
    let unread = unread_summary(&record.issue, &record.comments);
    IssueSummary {
        issue: record.issue,
        unread,
    }
}

/// Records that `viewer` has seen the issue as of the server clock.
pub async fn mark_viewed(store: &dyn IssueStore, id: u64, viewer: Role) -> Result<IssueSummary, ApiError> {
    let issue = store
        .mark_viewed(id, viewer, time::now())
        .await
        .map_err(ApiError::internal("Failed to mark issue as viewed"))?
        .ok_or(ApiError::NotFound("Issue"))?;

    let comments = store
        .comment_stamps(id)
        .await
        .map_err(ApiError::internal("Failed to mark issue as viewed"))?;

    tracing::debug!("Issue {} marked as viewed by {}", id, viewer);
    Ok(annotate(IssueRecord { issue, comments }))
}
