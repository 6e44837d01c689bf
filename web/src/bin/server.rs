//! Club portal HTTP server.

use anyhow::Context;
use club_portal_core::environment::SystemClock;
use club_portal_web::{build_router, AppState, Config};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "club_portal_web=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting club portal server");

    let config = Config::from_env();
    info!(server = ?config.server, auth = ?config.auth, "Configuration loaded");

    let state = AppState::new(Arc::new(SystemClock), config.auth.session_ttl);

    match &config.auth.admin_password {
        Some(password) => {
            state
                .seed_admin(&config.auth.admin_username, &config.auth.admin_email, password)
                .await
                .context("failed to create the admin account")?;
        },
        None => warn!("ADMIN_PASSWORD not set; no admin account will be created"),
    }

    let app = build_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            info!("Server stopped");
            return Ok(());
        },
        () = shutdown_signal() => {},
    }

    let _ = stop_tx.send(());
    match tokio::time::timeout(config.server.shutdown_timeout, server).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout.as_secs(),
            "In-flight requests did not finish before the shutdown timeout"
        ),
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
