use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Electricity,
    Roads,
    Water,
    Waste,
    Safety,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electricity,
        Category::Roads,
        Category::Water,
        Category::Waste,
        Category::Safety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electricity => "Electricity",
            Category::Roads => "Roads",
            Category::Water => "Water",
            Category::Waste => "Waste",
            Category::Safety => "Safety",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(ValidationError::InvalidCategory)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    #[default]
    Pending,
    #[serde(rename = "In-Progress")]
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [
        IssueStatus::Pending,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "Pending",
            IssueStatus::InProgress => "In-Progress",
            IssueStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or(ValidationError::InvalidStatus)
    }
}

/// Which side of the conversation a comment author or a viewer is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reporter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reporter => "reporter",
        }
    }

    /// Parses the `admin` / `reporter` tag used by author and viewer fields.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "reporter" => Some(Role::Reporter),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub status: IssueStatus,
    pub photo_url: Option<String>,
    pub reporter_name: Option<String>,
    pub reporter_email: Option<String>,
    pub reporter_phone: Option<String>,
    pub last_admin_view: Option<DateTime<Utc>>,
    pub last_reporter_view: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn watermark(&self, viewer: Role) -> Option<DateTime<Utc>> {
        match viewer {
            Role::Admin => self.last_admin_view,
            Role::Reporter => self.last_reporter_view,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub issue_id: u64,
    pub content: String,
    pub author_name: String,
    pub author_type: Role,
    pub created_at: DateTime<Utc>,
}

/// The part of a comment the unread computation needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommentStamp {
    pub author_type: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentStamp {
    fn from(comment: &Comment) -> Self {
        CommentStamp {
            author_type: comment.author_type,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssueRecord {
    pub issue: Issue,
    pub comments: Vec<CommentStamp>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadSummary {
    pub unread_admin_comments: usize,
    pub unread_reporter_comments: usize,
    pub total_comments: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueSummary {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(flatten)]
    pub unread: UnreadSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub photo_url: Option<String>,
    pub reporter_name: Option<String>,
    pub reporter_email: Option<String>,
    pub reporter_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub issue_id: u64,
    pub content: String,
    pub author_name: String,
    pub author_type: Role,
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub status: Option<IssueStatus>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        if self.category.is_some_and(|c| c != issue.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != issue.status) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let needle = term.to_lowercase();
                [&issue.title, &issue.description, &issue.location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub by_category: Vec<CategoryCount>,
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub email: String,
    pub name: String,
}

impl From<&AdminAccount> for Principal {
    fn from(admin: &AdminAccount) -> Self {
        Principal {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
        }
    }
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub admin: Principal,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub admin: Principal,
}

#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub content: Option<String>,
    pub author_name: Option<String>,
    pub author_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkViewedRequest {
    pub viewer_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse<T> {
    pub message: String,
    pub issue: T,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(title: &str, category: Category, status: IssueStatus) -> Issue {
        let now = Utc::now();
        Issue {
            id: 1,
            title: title.to_string(),
            description: "deep hole".to_string(),
            category,
            location: "5th Ave".to_string(),
            status,
            photo_url: None,
            reporter_name: None,
            reporter_email: None,
            reporter_phone: None,
            last_admin_view: None,
            last_reporter_view: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Water".parse::<Category>().unwrap(), Category::Water);
        assert_eq!("In-Progress".parse::<IssueStatus>().unwrap(), IssueStatus::InProgress);
        assert!(matches!("Nuclear".parse::<Category>(), Err(ValidationError::InvalidCategory)));
        assert!(matches!("Closed".parse::<IssueStatus>(), Err(ValidationError::InvalidStatus)));
        assert!("water".parse::<Category>().is_err());
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn test_issue_serializes_camel_case() {
        let value = serde_json::to_value(issue("Pothole", Category::Roads, IssueStatus::InProgress)).unwrap();
        assert_eq!(value["status"], "In-Progress");
        assert_eq!(value["category"], "Roads");
        assert!(value["photoUrl"].is_null());
        assert!(value.get("lastAdminView").is_some());
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = IssueFilter {
            search: Some("HOLE".to_string()),
            category: Some(Category::Roads),
            status: Some(IssueStatus::Pending),
        };
        assert!(filter.matches(&issue("Pothole", Category::Roads, IssueStatus::Pending)));
        assert!(!filter.matches(&issue("Pothole", Category::Water, IssueStatus::Pending)));
        assert!(!filter.matches(&issue("Pothole", Category::Roads, IssueStatus::Resolved)));

        let by_location = IssueFilter {
            search: Some("5TH".to_string()),
            ..Default::default()
        };
        assert!(by_location.matches(&issue("Streetlight", Category::Electricity, IssueStatus::Pending)));

        let miss = IssueFilter {
            search: Some("bridge".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&issue("Pothole", Category::Roads, IssueStatus::Pending)));
        assert!(IssueFilter::default().matches(&issue("Pothole", Category::Roads, IssueStatus::Pending)));
    }
}
