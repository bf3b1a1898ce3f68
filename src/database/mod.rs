pub mod memory;
pub mod mysql;
pub mod schema;
pub mod seed;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{pool::PoolOptions, MySql, Pool};

use crate::models::{
    AdminAccount, Comment, CommentStamp, Issue, IssueFilter, IssueRecord, IssueStatus, NewComment,
    NewIssue, Role, Statistics,
};

const MAX_RETRIES: u32 = 10;
const INITIAL_RETRY_DELAY_SECS: u64 = 2;
const MAX_RETRY_DELAY_SECS: u64 = 30;

/// Persistence for issues, their comments and admin accounts.
///
/// Each method is a single atomic operation. A missing issue is reported
/// through `Option`/`bool`, never as an error.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Matching issues newest-first, each with the stamps of its comments.
    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<IssueRecord>>;

    /// Every issue newest-first, without comments.
    async fn all_issues(&self) -> Result<Vec<Issue>>;

    async fn get_issue(&self, id: u64) -> Result<Option<Issue>>;

    async fn create_issue(&self, issue: NewIssue, now: DateTime<Utc>) -> Result<Issue>;

    async fn update_status(&self, id: u64, status: IssueStatus, now: DateTime<Utc>) -> Result<Option<Issue>>;

    /// Removes the issue and its comments.
    async fn delete_issue(&self, id: u64) -> Result<bool>;

    /// Comments oldest-first, or `None` when the issue does not exist.
    async fn list_comments(&self, issue_id: u64) -> Result<Option<Vec<Comment>>>;

    async fn comment_stamps(&self, issue_id: u64) -> Result<Vec<CommentStamp>>;

    /// `None` when the issue does not exist.
    async fn add_comment(&self, comment: NewComment, now: DateTime<Utc>) -> Result<Option<Comment>>;

    /// Moves the viewer's watermark to `now`, or leaves it if it is already later.
    async fn mark_viewed(&self, id: u64, viewer: Role, now: DateTime<Utc>) -> Result<Option<Issue>>;

    async fn statistics(&self) -> Result<Statistics>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminAccount>>;

    async fn upsert_admin(&self, email: &str, password_hash: &str, name: &str) -> Result<AdminAccount>;
}

pub async fn create_pool(config: &crate::config::Config) -> Result<Pool<MySql>> {
    let database_url = config.database_url();
    tracing::info!(
        "Connecting to MySQL (password hidden): mysql://{}:***@{}:{}/{}",
        config.db_user,
        config.db_host,
        config.db_port,
        config.db_name
    );

    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        tracing::info!("Connection attempt {} of {}", attempt, MAX_RETRIES);

        let pool_options = PoolOptions::<MySql>::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800));

        match pool_options.connect(&database_url).await {
            Ok(pool) => match test_connection_with_retries(&pool, 3).await {
                Ok(_) => {
                    tracing::info!(
                        "Database connected to {}:{}/{} on attempt {}",
                        config.db_host,
                        config.db_port,
                        config.db_name,
                        attempt
                    );
                    return Ok(pool);
                }
                Err(e) => {
                    tracing::warn!("Connection pool created but test query failed: {}. Retrying...", e);
                    last_error = Some(e);
                }
            },
            Err(e) => {
                tracing::warn!("Connection attempt {} failed: {}", attempt, e);
                last_error = Some(anyhow::anyhow!("{}", e));
            }
        }

        if attempt < MAX_RETRIES {
            // 2s, 4s, 8s, 16s, then capped at 30s
            let delay_secs = std::cmp::min(
                INITIAL_RETRY_DELAY_SECS * (1u64 << (attempt - 1)),
                MAX_RETRY_DELAY_SECS,
            );
            tracing::info!("Waiting {} seconds before next attempt...", delay_secs);
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed to connect after {} attempts", MAX_RETRIES)))
        .context("Failed to establish database connection after all retries")
}

async fn test_connection_with_retries(pool: &Pool<MySql>, max_retries: u32) -> Result<()> {
    for attempt in 1..=max_retries {
        match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                if attempt < max_retries {
                    tracing::warn!("Test query failed on attempt {}: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                } else {
                    return Err(e).context("Test query failed after all retries");
                }
            }
        }
    }
    Err(anyhow::anyhow!("Test query failed after {} attempts", max_retries))
}
