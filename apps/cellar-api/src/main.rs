//! # Cellar API Server
//!
//! ```bash
//! # Defaults: 127.0.0.1:8080, ./cellar.db
//! cargo run -p cellar-api
//!
//! # Overrides
//! CELLAR_PORT=9000 CELLAR_DB_PATH=/var/lib/cellar/cellar.db cargo run -p cellar-api
//! RUST_LOG=debug cargo run -p cellar-api
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cellar_api::config::ApiConfig;
use cellar_api::state::AppState;
use cellar_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Cellar API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    let addr = config.socket_addr()?;
    info!(
        addr = %addr,
        db_path = %config.db_path.display(),
        default_tenant = %config.default_tenant,
        "Configuration loaded"
    );

    let db_config = DbConfig::new(config.db_path.clone()).max_connections(config.max_connections);
    let db = Database::new(db_config)
        .await
        .context("opening database")?;
    info!("Database ready");

    let state = AppState::new(db.clone(), config);
    let app = cellar_api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "Cellar API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Cellar API stopped");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cellar=debug,sqlx=warn,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
