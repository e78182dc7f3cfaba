//! HTTP surface: route table, shared handler state, and server lifecycle.

use std::path::PathBuf;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::entities::trial::TrialSearchConfig;
use crate::sources::ctgov::CtGovClient;

mod routes;

/// State cloned into every request handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub client: CtGovClient,
    pub search: TrialSearchConfig,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for paths the API routes do not claim.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub(crate) fn from_env(host: String, port: u16) -> Self {
        let static_dir = std::env::var("TRIALWATCH_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));
        Self {
            host,
            port,
            static_dir,
        }
    }
}

/// Builds the registry client and serves the API until Ctrl-C.
pub async fn run_http(
    host: &str,
    port: u16,
    server_side_date_filter: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        client: CtGovClient::new()?,
        search: TrialSearchConfig {
            server_side_date_filter,
            ..TrialSearchConfig::default()
        },
    };
    let config = ServerConfig::from_env(host.to_string(), port);
    serve(config, state).await
}

pub(crate) fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api", get(routes::api_status))
        .route("/api/search_trials", post(routes::search_trials))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Serving on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server simply runs until killed.
        tracing::warn!("Ctrl-C handler unavailable: {err}");
        std::future::pending::<()>().await;
    }
}
