use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::IssueStore;
use crate::models::{
    AdminAccount, CategoryCount, Comment, CommentStamp, Issue, IssueFilter, IssueRecord, IssueStatus,
    NewComment, NewIssue, Role, Statistics,
};

/// Process-local store used with `STORE_BACKEND=memory` and in tests.
#[derive(Clone, Default)]
pub struct InMemoryIssueStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    issues: BTreeMap<u64, Issue>,
    comments: BTreeMap<u64, Comment>,
    admins: BTreeMap<u64, AdminAccount>,
    next_issue_id: u64,
    next_comment_id: u64,
    next_admin_id: u64,
}

impl MemoryState {
    fn stamps(&self, issue_id: u64) -> Vec<CommentStamp> {
        self.comments_of(issue_id).iter().map(|c| CommentStamp::from(*c)).collect()
    }

    fn comments_of(&self, issue_id: u64) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| c.issue_id == issue_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
    }

    fn newest_first(&self) -> Vec<&Issue> {
        let mut issues: Vec<&Issue> = self.issues.values().collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        issues
    }
}

impl InMemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| anyhow::anyhow!("in-memory store lock poisoned: {}", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| anyhow::anyhow!("in-memory store lock poisoned: {}", e))
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>> {
        let state = self.read()?;
        Ok(state
            .newest_first()
            .into_iter()
            .filter(|issue| filter.matches(issue))
            .map(|issue| IssueRecord {
                issue: issue.clone(),
                comments: state.stamps(issue.id),
            })
            .collect())
    }

    async fn all_issues(&self) -> Result<Vec<Issue>> {
        let state = self.read()?;
        Ok(state.newest_first().into_iter().cloned().collect())
    }

    async fn get_issue(&self, id: u64) -> Result<Option<Issue>> {
        Ok(self.read()?.issues.get(&id).cloned())
    }

    async fn create_issue(&self, issue: NewIssue, now: DateTime<Utc>) -> Result<Issue> {
        let mut state = self.write()?;
        state.next_issue_id += 1;
        let created = Issue {
            id: state.next_issue_id,
            title: issue.title,
            description: issue.description,
            category: issue.category,
            location: issue.location,
            status: IssueStatus::default(),
            photo_url: issue.photo_url,
            reporter_name: issue.reporter_name,
            reporter_email: issue.reporter_email,
            reporter_phone: issue.reporter_phone,
            last_admin_view: None,
            last_reporter_view: None,
            created_at: now,
            updated_at: now,
        };
        state.issues.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_status(&self, id: u64, status: IssueStatus, now: DateTime<Utc>) -> Result<Option<Issue>> {
        let mut state = self.write()?;
        Ok(state.issues.get_mut(&id).map(|issue| {
            issue.status = status;
            issue.updated_at = now;
            issue.clone()
        }))
    }

    async fn delete_issue(&self, id: u64) -> Result<bool> {
        let mut state = self.write()?;
        if state.issues.remove(&id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, c| c.issue_id != id);
        Ok(true)
    }

    async fn list_comments(&self, issue_id: u64) -> Result<Option<Vec<Comment>>> {
        let state = self.read()?;
        if !state.issues.contains_key(&issue_id) {
            return Ok(None);
        }
        Ok(Some(state.comments_of(issue_id).into_iter().cloned().collect()))
    }

    async fn comment_stamps(&self, issue_id: u64) -> Result<Vec<CommentStamp>> {
        Ok(self.read()?.stamps(issue_id))
    }

    async fn add_comment(&self, comment: NewComment, now: DateTime<Utc>) -> Result<Option<Comment>> {
        let mut state = self.write()?;
        if !state.issues.contains_key(&comment.issue_id) {
            return Ok(None);
        }
        state.next_comment_id += 1;
        let created = Comment {
            id: state.next_comment_id,
            issue_id: comment.issue_id,
            content: comment.content,
            author_name: comment.author_name,
            author_type: comment.author_type,
            created_at: now,
        };
        state.comments.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn mark_viewed(&self, id: u64, viewer: Role, now: DateTime<Utc>) -> Result<Option<Issue>> {
        let mut state = self.write()?;
        Ok(state.issues.get_mut(&id).map(|issue| {
            let slot = match viewer {
                Role::Admin => &mut issue.last_admin_view,
                Role::Reporter => &mut issue.last_reporter_view,
            };
            *slot = Some(slot.map_or(now, |current| current.max(now)));
            issue.updated_at = now;
            issue.clone()
        }))
    }

    async fn statistics(&self) -> Result<Statistics> {
        let state = self.read()?;
        let mut stats = Statistics::default();
        let mut by_category: BTreeMap<_, u64> = BTreeMap::new();
        for issue in state.issues.values() {
            stats.total += 1;
            match issue.status {
                IssueStatus::Pending => stats.pending += 1,
                IssueStatus::InProgress => stats.in_progress += 1,
                IssueStatus::Resolved => stats.resolved += 1,
            }
            *by_category.entry(issue.category).or_default() += 1;
        }
        stats.by_category = by_category
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        Ok(stats)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminAccount>> {
        Ok(self.read()?.admins.values().find(|a| a.email == email).cloned())
    }

    async fn upsert_admin(&self, email: &str, password_hash: &str, name: &str) -> Result<AdminAccount> {
        let mut state = self.write()?;
        if let Some(existing) = state.admins.values_mut().find(|a| a.email == email) {
            existing.password_hash = password_hash.to_string();
            existing.name = name.to_string();
            return Ok(existing.clone());
        }
        state.next_admin_id += 1;
        let admin = AdminAccount {
            id: state.next_admin_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
        };
        state.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Duration;

    fn new_issue(title: &str, category: Category) -> NewIssue {
        NewIssue {
            title: title.to_string(),
            description: "reported by a resident".to_string(),
            category,
            location: "Central Park".to_string(),
            photo_url: None,
            reporter_name: None,
            reporter_email: None,
            reporter_phone: None,
        }
    }

    fn comment(issue_id: u64, author_type: Role) -> NewComment {
        NewComment {
            issue_id,
            content: "any update?".to_string(),
            author_name: "Sam".to_string(),
            author_type,
        }
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_listing_is_newest_first() {
        let store = InMemoryIssueStore::new();
        let t0 = Utc::now();
        let first = store.create_issue(new_issue("first", Category::Roads), t0).await.unwrap();
        let second = store
            .create_issue(new_issue("second", Category::Water), t0 + Duration::seconds(1))
            .await
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.status, IssueStatus::Pending);

        let listed = store.list_issues(&IssueFilter::default()).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|r| r.issue.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let store = InMemoryIssueStore::new();
        let now = Utc::now();
        let issue = store.create_issue(new_issue("leak", Category::Water), now).await.unwrap();
        store.add_comment(comment(issue.id, Role::Reporter), now).await.unwrap();

        assert!(store.delete_issue(issue.id).await.unwrap());
        assert!(!store.delete_issue(issue.id).await.unwrap());
        assert!(store.list_comments(issue.id).await.unwrap().is_none());
        assert!(store.comment_stamps(issue.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_comment_to_missing_issue() {
        let store = InMemoryIssueStore::new();
        let added = store.add_comment(comment(42, Role::Admin), Utc::now()).await.unwrap();
        assert!(added.is_none());
    }

    #[tokio::test]
    async fn test_comments_are_oldest_first() {
        let store = InMemoryIssueStore::new();
        let t0 = Utc::now();
        let issue = store.create_issue(new_issue("leak", Category::Water), t0).await.unwrap();
        store
            .add_comment(comment(issue.id, Role::Admin), t0 + Duration::seconds(5))
            .await
            .unwrap();
        store
            .add_comment(comment(issue.id, Role::Reporter), t0 + Duration::seconds(1))
            .await
            .unwrap();

        let comments = store.list_comments(issue.id).await.unwrap().unwrap();
        assert_eq!(comments[0].author_type, Role::Reporter);
        assert_eq!(comments[1].author_type, Role::Admin);
    }

    #[tokio::test]
    async fn test_mark_viewed_never_moves_backward() {
        let store = InMemoryIssueStore::new();
        let t0 = Utc::now();
        let issue = store.create_issue(new_issue("leak", Category::Water), t0).await.unwrap();

        let later = t0 + Duration::minutes(10);
        store.mark_viewed(issue.id, Role::Admin, later).await.unwrap();
        let viewed = store.mark_viewed(issue.id, Role::Admin, t0).await.unwrap().unwrap();
        assert_eq!(viewed.last_admin_view, Some(later));
        assert_eq!(viewed.last_reporter_view, None);

        assert!(store.mark_viewed(999, Role::Admin, t0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_statistics_only_lists_present_categories() {
        let store = InMemoryIssueStore::new();
        let now = Utc::now();
        let a = store.create_issue(new_issue("a", Category::Water), now).await.unwrap();
        store.create_issue(new_issue("b", Category::Water), now).await.unwrap();
        store.create_issue(new_issue("c", Category::Electricity), now).await.unwrap();
        store.update_status(a.id, IssueStatus::Resolved, now).await.unwrap();

        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.in_progress, 0);
        assert_eq!(stats.resolved, 1);
        assert_eq!(
            stats.by_category,
            vec![
                CategoryCount { category: Category::Electricity, count: 1 },
                CategoryCount { category: Category::Water, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_admin_replaces_by_email() {
        let store = InMemoryIssueStore::new();
        let first = store.upsert_admin("admin@community.com", "hash-1", "Admin").await.unwrap();
        let second = store.upsert_admin("admin@community.com", "hash-2", "System Admin").await.unwrap();
        assert_eq!(first.id, second.id);

        let found = store.find_admin_by_email("admin@community.com").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "hash-2");
        assert_eq!(found.name, "System Admin");
        assert!(store.find_admin_by_email("nobody@community.com").await.unwrap().is_none());
    }
}
