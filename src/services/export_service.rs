use anyhow::{Context, Result};
use chrono::SecondsFormat;
use csv::{Terminator, WriterBuilder};

use crate::database::IssueStore;
use crate::error::ApiError;
use crate::models::Issue;

pub const EXPORT_FILE_NAME: &str = "issues-export.csv";

const HEADER: [&str; 8] = [
    "ID",
    "Title",
    "Description",
    "Category",
    "Location",
    "Status",
    "Created At",
    "Photo URL",
];

/// Renders issues as CSV, one row per issue in the given order.
pub fn write_csv(issues: &[Issue]) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for issue in issues {
        wtr.write_record([
            issue.id.to_string().as_str(),
            &issue.title,
            &issue.description,
            issue.category.as_str(),
            &issue.location,
            issue.status.as_str(),
            &issue.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            issue.photo_url.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.into_inner().context("Failed to flush CSV writer")
}

pub async fn export_csv(store: &dyn IssueStore) -> Result<Vec<u8>, ApiError> {
    let issues = store
        .all_issues()
        .await
        .map_err(ApiError::internal("Failed to export issues"))?;
    let body = write_csv(&issues).map_err(ApiError::internal("Failed to export issues"))?;
    tracing::info!("Exported {} issues", issues.len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, IssueStatus};
    use chrono::Utc;
    use csv::ReaderBuilder;

    fn issue(id: u64, title: &str, photo_url: Option<&str>) -> Issue {
        let now = Utc::now();
        Issue {
            id,
            title: title.to_string(),
            description: "line one\nline two".to_string(),
            category: Category::Water,
            location: "Main St".to_string(),
            status: IssueStatus::InProgress,
            photo_url: photo_url.map(str::to_string),
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
    fn test_empty_export_is_header_only() {
        let body = write_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "ID,Title,Description,Category,Location,Status,Created At,Photo URL\n"
        );
    }

    #[test]
    fn test_fields_with_quotes_and_commas_survive() {
        let issues = [
            issue(2, "Leak, \"Main\" St", None),
            issue(1, "Pothole", Some("https://cdn.test/issues/a.png")),
        ];
        let body = write_csv(&issues).unwrap();

        let mut rdr = ReaderBuilder::new().from_reader(body.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2");
        assert_eq!(&rows[0][1], "Leak, \"Main\" St");
        assert_eq!(&rows[0][2], "line one\nline two");
        assert_eq!(&rows[0][5], "In-Progress");
        assert_eq!(&rows[0][7], "");
        assert_eq!(&rows[1][7], "https://cdn.test/issues/a.png");
    }
}
