use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use nanobatch::error::ConfigError;
use nanobatch::{BatchEngine, SettingsStore};
use nanobatch_server::config::{ServerConfig, ServerConfigError};
use nanobatch_server::state::AppState;

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ServerConfigError),

    #[error(transparent)]
    Settings(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

fn init_logging(json: bool) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already initialized: {}", e);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nanobatch=info,nanobatch_server=info,tower_http=info".into());

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
    {
        eprintln!("tracing subscriber already initialized: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;
    init_logging(config.log_json);

    let settings = match &config.settings_path {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::at_default_location()?,
    };
    tracing::info!(path = %settings.path().display(), "Using settings file");

    let state = AppState::new(Arc::new(BatchEngine::default()), Arc::new(settings));
    let app = nanobatch_server::build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!("nano-batch server -> http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}
