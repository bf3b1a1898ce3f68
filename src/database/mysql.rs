use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{mysql::MySqlRow, MySql, MySqlPool, QueryBuilder, Row};

use super::IssueStore;
use crate::models::{
    AdminAccount, Category, CategoryCount, Comment, CommentStamp, Issue, IssueFilter, IssueRecord,
    IssueStatus, NewComment, NewIssue, Role, Statistics,
};

const ISSUE_COLUMNS: &str = "id, title, description, category, location, status, photo_url, \
     reporter_name, reporter_email, reporter_phone, last_admin_view, last_reporter_view, \
     created_at, updated_at";

#[derive(Clone)]
pub struct MySqlIssueStore {
    pool: MySqlPool,
}

impl MySqlIssueStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Builds a `LIKE` pattern that matches `term` literally anywhere in a
/// lowercased column.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn watermark_column(viewer: Role) -> &'static str {
    match viewer {
        Role::Admin => "last_admin_view",
        Role::Reporter => "last_reporter_view",
    }
}

fn issue_from_row(row: &MySqlRow) -> Result<Issue> {
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;
    Ok(Issue {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: category
            .parse::<Category>()
            .with_context(|| format!("unknown category '{}' in issues table", category))?,
        location: row.try_get("location")?,
        status: status
            .parse::<IssueStatus>()
            .with_context(|| format!("unknown status '{}' in issues table", status))?,
        photo_url: row.try_get("photo_url")?,
        reporter_name: row.try_get("reporter_name")?,
        reporter_email: row.try_get("reporter_email")?,
        reporter_phone: row.try_get("reporter_phone")?,
        last_admin_view: row.try_get("last_admin_view")?,
        last_reporter_view: row.try_get("last_reporter_view")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_from_row(row: &MySqlRow) -> Result<Role> {
    let author_type: String = row.try_get("author_type")?;
    Role::parse(&author_type).with_context(|| format!("unknown author_type '{}' in comments table", author_type))
}

fn comment_from_row(row: &MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        issue_id: row.try_get("issue_id")?,
        content: row.try_get("content")?,
        author_name: row.try_get("author_name")?,
        author_type: role_from_row(row)?,
        created_at: row.try_get("created_at")?,
    })
}

fn admin_from_row(row: &MySqlRow) -> Result<AdminAccount> {
    Ok(AdminAccount {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
    })
}

impl MySqlIssueStore {
    async fn stamps_for(&self, ids: &[u64]) -> Result<HashMap<u64, Vec<CommentStamp>>> {
        let mut stamps: HashMap<u64, Vec<CommentStamp>> = HashMap::new();
        if ids.is_empty() {
            return Ok(stamps);
        }

        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT issue_id, author_type, created_at FROM comments WHERE issue_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        for row in rows {
            let issue_id: u64 = row.try_get("issue_id")?;
            stamps.entry(issue_id).or_default().push(CommentStamp {
                author_type: role_from_row(&row)?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(stamps)
    }
}

#[async_trait]
impl IssueStore for MySqlIssueStore {
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>> {
        let mut qb = QueryBuilder::<MySql>::new(format!("SELECT {} FROM issues WHERE 1 = 1", ISSUE_COLUMNS));
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(term) = &filter.search {
            let pattern = like_pattern(term);
            qb.push(" AND (LOWER(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(description) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(location) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let issues = rows.iter().map(issue_from_row).collect::<Result<Vec<_>>>()?;

        let ids: Vec<u64> = issues.iter().map(|i| i.id).collect();
        let mut stamps = self.stamps_for(&ids).await?;

        Ok(issues
            .into_iter()
            .map(|issue| IssueRecord {
                comments: stamps.remove(&issue.id).unwrap_or_default(),
                issue,
            })
            .collect())
    }

    async fn all_issues(&self) -> Result<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM issues ORDER BY created_at DESC, id DESC",
            ISSUE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn get_issue(&self, id: u64) -> Result<Option<Issue>> {
        let row = sqlx::query(&format!("SELECT {} FROM issues WHERE id = ?", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(issue_from_row).transpose()
    }

    async fn create_issue(&self, issue: NewIssue, now: DateTime<Utc>) -> Result<Issue> {
        let status = IssueStatus::default();
        let result = sqlx::query(
            "INSERT INTO issues (title, description, category, location, status, photo_url,
                 reporter_name, reporter_email, reporter_phone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.category.as_str())
        .bind(&issue.location)
        .bind(status.as_str())
        .bind(&issue.photo_url)
        .bind(&issue.reporter_name)
        .bind(&issue.reporter_email)
        .bind(&issue.reporter_phone)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Issue {
            id: result.last_insert_id(),
            title: issue.title,
            description: issue.description,
            category: issue.category,
            location: issue.location,
            status,
            photo_url: issue.photo_url,
            reporter_name: issue.reporter_name,
            reporter_email: issue.reporter_email,
            reporter_phone: issue.reporter_phone,
            last_admin_view: None,
            last_reporter_view: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update_status(&self, id: u64, status: IssueStatus, now: DateTime<Utc>) -> Result<Option<Issue>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE issues SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query(&format!("SELECT {} FROM issues WHERE id = ?", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        row.as_ref().map(issue_from_row).transpose()
    }

    async fn delete_issue(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM issues WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, issue_id: u64) -> Result<Option<Vec<Comment>>> {
        let exists: Option<u64> = sqlx::query_scalar("SELECT id FROM issues WHERE id = ?")
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT id, issue_id, content, author_name, author_type, created_at
             FROM comments WHERE issue_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(comment_from_row).collect::<Result<Vec<_>>>().map(Some)
    }

    async fn comment_stamps(&self, issue_id: u64) -> Result<Vec<CommentStamp>> {
        Ok(self.stamps_for(&[issue_id]).await?.remove(&issue_id).unwrap_or_default())
    }

    async fn add_comment(&self, comment: NewComment, now: DateTime<Utc>) -> Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;
        // Lock the parent row so a concurrent delete cannot slip in between.
        let exists: Option<u64> = sqlx::query_scalar("SELECT id FROM issues WHERE id = ? FOR UPDATE")
            .bind(comment.issue_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "INSERT INTO comments (issue_id, content, author_name, author_type, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.issue_id)
        .bind(&comment.content)
        .bind(&comment.author_name)
        .bind(comment.author_type.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(Comment {
            id: result.last_insert_id(),
            issue_id: comment.issue_id,
            content: comment.content,
            author_name: comment.author_name,
            author_type: comment.author_type,
            created_at: now,
        }))
    }

    async fn mark_viewed(&self, id: u64, viewer: Role, now: DateTime<Utc>) -> Result<Option<Issue>> {
        let column = watermark_column(viewer);
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!(
            "UPDATE issues SET {col} = GREATEST(COALESCE({col}, ?), ?), updated_at = ? WHERE id = ?",
            col = column
        ))
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query(&format!("SELECT {} FROM issues WHERE id = ?", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        row.as_ref().map(issue_from_row).transpose()
    }

    async fn statistics(&self) -> Result<Statistics> {
        let mut stats = Statistics::default();

        let status_rows = sqlx::query("SELECT status, COUNT(*) AS total FROM issues GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        for row in status_rows {
            let status: String = row.try_get("status")?;
            let total: i64 = row.try_get("total")?;
            let total = u64::try_from(total)?;
            stats.total += total;
            match status.parse::<IssueStatus>() {
                Ok(IssueStatus::Pending) => stats.pending += total,
                Ok(IssueStatus::InProgress) => stats.in_progress += total,
                Ok(IssueStatus::Resolved) => stats.resolved += total,
                Err(_) => tracing::warn!("Ignoring unknown status '{}' in statistics", status),
            }
        }

        let category_rows = sqlx::query("SELECT category, COUNT(*) AS total FROM issues GROUP BY category")
            .fetch_all(&self.pool)
            .await?;
        let mut by_category = Vec::new();
        for row in category_rows {
            let category: String = row.try_get("category")?;
            let total: i64 = row.try_get("total")?;
            match category.parse::<Category>() {
                Ok(category) => by_category.push(CategoryCount {
                    category,
                    count: u64::try_from(total)?,
                }),
                Err(_) => tracing::warn!("Ignoring unknown category '{}' in statistics", category),
            }
        }
        by_category.sort_by_key(|c| c.category);
        stats.by_category = by_category;

        Ok(stats)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminAccount>> {
        let row = sqlx::query("SELECT id, email, password_hash, name FROM admins WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(admin_from_row).transpose()
    }

    async fn upsert_admin(&self, email: &str, password_hash: &str, name: &str) -> Result<AdminAccount> {
        sqlx::query(
            "INSERT INTO admins (email, password_hash, name) VALUES (?, ?, ?)
             ON DUPLICATE KEY UPDATE password_hash = VALUES(password_hash), name = VALUES(name)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .execute(&self.pool)
        .await?;

        self.find_admin_by_email(email)
            .await?
            .with_context(|| format!("admin '{}' missing after upsert", email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_and_lowercases() {
        assert_eq!(like_pattern("Main St"), "%main st%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }

    #[test]
    fn test_watermark_columns() {
        assert_eq!(watermark_column(Role::Admin), "last_admin_view");
        assert_eq!(watermark_column(Role::Reporter), "last_reporter_view");
    }
}
