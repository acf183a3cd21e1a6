//! # HTTP API
//!
//! axum server exposing the catalog: unauthenticated reads, token-gated
//! writes, CSV/XLSX export and a static table page at `/`.

pub mod auth;
mod error;
mod handlers;

pub use error::ApiError;

use crate::api::auth::AccessGate;
use crate::config::Config;
use axum::Router;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{get, post};
use cpudex_core::RedbStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state: the storage handle plus the (optional) gate.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RedbStore>,
    /// `None` when no admin password is configured; all writes then fail 401.
    pub gate: Option<Arc<AccessGate>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<RedbStore>, gate: Option<AccessGate>) -> Self {
        Self {
            store,
            gate: gate.map(Arc::new),
        }
    }

    /// Build state from configuration.
    #[must_use]
    pub fn from_config(store: Arc<RedbStore>, config: &Config) -> Self {
        let gate = config
            .admin_password
            .as_deref()
            .map(|password| AccessGate::new(password, config.token_secret.as_deref()));
        Self::new(store, gate)
    }
}

/// Assemble the full application router.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api", get(handlers::api_info))
        .route("/api/cpus", get(handlers::list_cpus).post(handlers::create_cpu))
        .route("/api/cpus/search", get(handlers::search_cpus))
        .route(
            "/api/cpus/{id}",
            get(handlers::get_cpu)
                .put(handlers::update_cpu)
                .delete(handlers::delete_cpu),
        )
        .route("/api/stats", get(handlers::stats))
        .route("/api/export/csv", get(handlers::export_csv))
        .route("/api/export/excel", get(handlers::export_excel))
        .route("/api/import/csv", post(handlers::import_csv))
        .route("/auth/token", post(handlers::issue_token))
        .route("/auth/me", get(handlers::whoami))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and run the server until a shutdown signal arrives.
pub async fn serve(config: &Config, state: AppState) -> std::io::Result<()> {
    let app = router(state, &config.static_dir);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
