use anyhow::Result;
use sqlx::{MySql, Pool};
use tracing::info;

pub async fn initialize_schema(pool: &Pool<MySql>) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            email VARCHAR(255) NOT NULL UNIQUE,
            password_hash VARCHAR(255) NOT NULL,
            name VARCHAR(255) NOT NULL,
            created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            title VARCHAR(255) NOT NULL,
            description TEXT NOT NULL,
            category VARCHAR(32) NOT NULL,
            location VARCHAR(512) NOT NULL,
            status VARCHAR(32) NOT NULL DEFAULT 'Pending',
            photo_url VARCHAR(1024) NULL,
            reporter_name VARCHAR(255) NULL,
            reporter_email VARCHAR(255) NULL,
            reporter_phone VARCHAR(64) NULL,
            last_admin_view DATETIME(6) NULL,
            last_reporter_view DATETIME(6) NULL,
            created_at DATETIME(6) NOT NULL,
            updated_at DATETIME(6) NOT NULL,
            INDEX idx_status (status),
            INDEX idx_category (category),
            INDEX idx_created_at (created_at DESC)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
            issue_id BIGINT UNSIGNED NOT NULL,
            content TEXT NOT NULL,
            author_name VARCHAR(255) NOT NULL,
            author_type VARCHAR(16) NOT NULL,
            created_at DATETIME(6) NOT NULL,
            INDEX idx_issue_created (issue_id, created_at),
            FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully");
    Ok(())
}
