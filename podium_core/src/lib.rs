//! Core library for the Podium media service: session exchange, uploads into
//! the public uploads tree, and file listings.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod files;
pub mod handlers;
pub mod middleware;

pub use auth::{IdentityProvider, JwtIdentityProvider, SharedIdentityProvider, VerifiedIdentity};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use files::{FileStore, StorageLayout, StoredFile};
pub use handlers::routes::create_routes;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Room for the non-file form fields and multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub config: Arc<AppConfig>,
    pub identity: SharedIdentityProvider,
    pub file_store: FileStore,
}

impl AppState {
    pub fn new(config: AppConfig, identity: SharedIdentityProvider) -> Self {
        let file_store = FileStore::from_config(&config.storage);

        Self {
            app_name: "Podium".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: Arc::new(config),
            identity,
            file_store,
        }
    }

    pub fn with_file_store(mut self, file_store: FileStore) -> Self {
        self.file_store = file_store;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();
    let layout = state.file_store.layout().clone();

    let body_limit = config
        .storage
        .max_upload_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .merge(create_routes())
        .nest_service(&layout.uploads_url_prefix(), ServeDir::new(layout.uploads_root()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session::session_middleware,
        ))
        .layer(middleware::cors::cors_layer_from_config(&config.cors))
        .layer(middleware::logging::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
