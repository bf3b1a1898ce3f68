use std::sync::Arc;

use crate::database::IssueStore;
use crate::services::auth_service::AuthService;
use crate::services::photo_storage::PhotoStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IssueStore>,
    /// Unset when no object storage is configured; photo uploads are then rejected.
    pub photos: Option<Arc<dyn PhotoStore>>,
    pub auth: Arc<AuthService>,
}
