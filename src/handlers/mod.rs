pub mod auth;
pub mod comments;
pub mod export;
pub mod extractors;
pub mod health;
pub mod issues;
pub mod version;
