//! codblog-gateway server entry point.
//!
//! Serves HTTP and WebSocket connections through a single protocol router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use codblog_gateway::config::{GatewayConfig, LogFormat};
use codblog_gateway::domain::ChannelLayer;
use codblog_gateway::entrypoint::{Collaborators, build_application};
use codblog_gateway::persistence::{self, PostgresSessionStore, PostgresUserDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        settings_module = %config.settings_module,
        "starting codblog-gateway"
    );

    // Build collaborators
    let collaborators = match &config.database_url {
        Some(url) => {
            let pool = persistence::connect(
                url,
                config.database_max_connections,
                std::time::Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await
            .context("connecting to PostgreSQL")?;
            persistence::run_migrations(&pool)
                .await
                .context("running database migrations")?;
            tracing::info!("database migrations complete");

            Collaborators {
                sessions: Arc::new(PostgresSessionStore::new(pool.clone())),
                users: Arc::new(PostgresUserDirectory::new(pool)),
                channel_layer: ChannelLayer::new(config.channel_capacity),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions and users are kept in memory");
            Collaborators::in_memory(config.channel_capacity)
        }
    };

    // Build router
    let application =
        build_application(&config, collaborators).context("building application")?;
    let app = Router::new()
        .fallback_service(application)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving connections")?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}
