use anyhow::{Context, Result};
use tracing::info;

use super::IssueStore;
use crate::config::Config;
use crate::models::{Category, IssueStatus, NewIssue};
use crate::services::auth_service;
use crate::utils::time;

const SAMPLE_ISSUES: [(&str, &str, Category, &str, IssueStatus); 5] = [
    (
        "Broken Streetlight on Main Street",
        "The streetlight near house #45 has been non-functional for 3 days, causing safety concerns.",
        Category::Electricity,
        "Main Street, near #45",
        IssueStatus::Pending,
    ),
    (
        "Pothole on Highway Road",
        "Large pothole causing vehicle damage. Urgent repair needed.",
        Category::Roads,
        "Highway Road, intersection with Oak Avenue",
        IssueStatus::InProgress,
    ),
    (
        "Water Leakage in Park Area",
        "Continuous water leakage from underground pipe in Central Park.",
        Category::Water,
        "Central Park, Zone B",
        IssueStatus::Pending,
    ),
    (
        "Waste Pickup Delayed",
        "Waste has not been collected for over a week in Sector 5.",
        Category::Waste,
        "Sector 5, residential area",
        IssueStatus::Resolved,
    ),
    (
        "Broken Fence at Community Center",
        "The fence surrounding the community center is broken, posing security risks.",
        Category::Safety,
        "Community Center, East Gate",
        IssueStatus::Pending,
    ),
];

/// Creates or refreshes the configured admin account.
pub async fn seed_admin(store: &dyn IssueStore, config: &Config) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        info!("ADMIN_EMAIL not set, skipping admin seed");
        return Ok(());
    };

    let hash = auth_service::hash_password(password).context("Failed to hash admin password")?;
    let admin = store.upsert_admin(email, &hash, &config.admin_name).await?;
    info!("Admin account ready: {} (id {})", admin.email, admin.id);
    Ok(())
}

/// Inserts the sample issues when the store holds no issues yet.
pub async fn seed_sample_issues(store: &dyn IssueStore) -> Result<usize> {
    if store.statistics().await?.total > 0 {
        info!("Issues already present, skipping sample seed");
        return Ok(0);
    }

    for (title, description, category, location, status) in SAMPLE_ISSUES {
        let issue = store
            .create_issue(
                NewIssue {
                    title: title.to_string(),
                    description: description.to_string(),
                    category,
                    location: location.to_string(),
                    photo_url: None,
                    reporter_name: None,
                    reporter_email: None,
                    reporter_phone: None,
                },
                time::now(),
            )
            .await?;
        if status != IssueStatus::Pending {
            store.update_status(issue.id, status, time::now()).await?;
        }
    }

    info!("Created {} sample issues", SAMPLE_ISSUES.len());
    Ok(SAMPLE_ISSUES.len())
}
