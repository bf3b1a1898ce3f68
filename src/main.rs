mod app_state;
mod config;
mod database;
mod error;
mod handlers;
mod models;
mod services;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app_state::AppState;
use crate::config::{Config, StoreBackend};
use crate::database::{memory::InMemoryIssueStore, mysql::MySqlIssueStore, IssueStore};
use crate::services::auth_service::AuthService;
use crate::services::photo_storage::{PhotoStore, SupabasePhotoStore};
use crate::utils::validation::MAX_PHOTO_BYTES;

/// Room for a full-size photo plus the text fields of the form.
const MAX_REQUEST_BYTES: usize = MAX_PHOTO_BYTES + 3 * 1024 * 1024;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("FATAL ERROR: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issue_tracker=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = handlers::version::build_info();
    tracing::info!(
        "=== Issue Tracker Service Starting === version {} ({})",
        build.version,
        build.git_sha.as_deref().unwrap_or("unknown commit")
    );

    match dotenvy::dotenv() {
        Ok(_) => tracing::info!("Environment variables loaded from .env file"),
        Err(_) => tracing::info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env()?;
    tracing::info!("Store backend: {:?}", config.store_backend);
    tracing::info!("Server port: {}", config.port);

    let store: Arc<dyn IssueStore> = match config.store_backend {
        StoreBackend::MySql => {
            tracing::info!("Database: {}:{}/{}", config.db_host, config.db_port, config.db_name);
            let pool = database::create_pool(&config).await?;
            database::schema::initialize_schema(&pool).await?;
            tracing::info!("Database schema initialized successfully");
            Arc::new(MySqlIssueStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on shutdown");
            Arc::new(InMemoryIssueStore::new())
        }
    };

    database::seed::seed_admin(store.as_ref(), &config).await?;
    if config.seed_sample_issues {
        database::seed::seed_sample_issues(store.as_ref()).await?;
    }

    let photos: Option<Arc<dyn PhotoStore>> = match config.supabase() {
        Some((url, key, bucket)) => {
            tracing::info!("Photo storage: bucket {} at {}", bucket, url);
            Some(Arc::new(SupabasePhotoStore::new(url, key, bucket)?))
        }
        None => {
            tracing::warn!("SUPABASE_URL/KEY/BUCKET not set, photo uploads are disabled");
            None
        }
    };

    let state = AppState {
        store,
        photos,
        auth: Arc::new(AuthService::new(
            config.jwt_secret.as_bytes(),
            chrono::Duration::hours(config.token_ttl_hours),
        )),
    };

    let app = create_router(state, cors_layer(config.frontend_url.as_deref())?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);
    tracing::info!("=== Issue Tracker Service Ready ===");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Allows only the configured frontend origin, or any origin when unset.
fn cors_layer(frontend_url: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match frontend_url {
        Some(origin) => {
            let origin = origin
                .trim_end_matches('/')
                .parse::<HeaderValue>()
                .with_context(|| format!("FRONTEND_URL '{}' is not a valid origin", origin))?;
            Ok(cors.allow_origin(origin))
        }
        None => Ok(cors.allow_origin(Any)),
    }
}

fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/version", get(handlers::version::version))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/verify", get(handlers::auth::verify))
        .route(
            "/api/issues",
            get(handlers::issues::list_issues).post(handlers::issues::create_issue),
        )
        .route("/api/issues/stats", get(handlers::issues::get_statistics))
        .route("/api/issues/export/csv", get(handlers::export::export_csv))
        .route(
            "/api/issues/:id",
            get(handlers::issues::get_issue).delete(handlers::issues::delete_issue),
        )
        .route("/api/issues/:id/status", patch(handlers::issues::update_status))
        .route(
            "/api/issues/:id/comments",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route("/api/issues/:id/mark-viewed", post(handlers::issues::mark_viewed))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down gracefully...");
        },
    }
}
