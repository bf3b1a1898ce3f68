pub mod auth_service;
pub mod comment_service;
pub mod export_service;
pub mod issue_service;
pub mod notification_service;
pub mod photo_storage;
