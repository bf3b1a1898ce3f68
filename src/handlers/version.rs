use axum::response::Json;

use crate::models::VersionResponse;

pub const SERVICE_NAME: &str = "issue-tracker";

/// Build metadata stamped in by the release pipeline; a local build only
/// knows its crate version.
pub fn build_info() -> VersionResponse {
    VersionResponse {
        service: SERVICE_NAME.to_string(),
        version: option_env!("ISSUE_TRACKER_BUILD_VERSION")
            .unwrap_or(env!("CARGO_PKG_VERSION"))
            .to_string(),
        git_sha: option_env!("ISSUE_TRACKER_GIT_SHA")
            .filter(|sha| !sha.is_empty())
            .map(str::to_string),
        build_time: option_env!("ISSUE_TRACKER_BUILD_TIME")
            .filter(|time| !time.is_empty())
            .map(str::to_string),
    }
}

pub async fn version() -> Json<VersionResponse> {
    Json(build_info())
}
