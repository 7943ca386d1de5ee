//! # Audio Separation Backend - Main Application Entry Point
//!
//! Hosts the audio separation function behind an Actix-web HTTP server.
//!
//! A caller POSTs a base64-encoded audio file; the function stores the original and a
//! "separated" copy (currently byte-identical) in an S3-compatible bucket and answers
//! with a CDN URL for the copy.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML file + environment variables)
//! - **error**: Error taxonomy and JSON error replies
//! - **cors**: The fixed CORS policy of the function
//! - **function**: Invocation event/response types and the method dispatch
//! - **separation**: Request body model, storage keys, the separation service
//! - **delivery**: CDN delivery URLs
//! - **storage**: Object store capability with S3 and in-memory backends
//! - **handlers**: HTTP adapters for the function
//! - **health**: Health and metrics endpoints
//! - **state**: Shared application state and request metrics
//! - **middleware**: Request logging and metrics

mod config;
mod cors;
mod delivery;
mod error;
mod function;
mod handlers;
mod health;
mod middleware;
mod separation;
mod state;
mod storage;

use crate::config::AppConfig;
use crate::separation::SeparationService;
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**
/// 3. **Builds the object store and the separation service** from that configuration
/// 4. **Runs the HTTP server** until it fails or a shutdown signal arrives
#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!(
        backend = %config.storage.backend,
        bucket = %config.storage.bucket,
        cdn_host = %config.delivery.cdn_host,
        "Storage configured"
    );

    let store = storage::create_store(&config.storage).await;
    let service = SeparationService::new(&config, store);
    let app_state = AppState::new(config.clone(), service);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware runs in reverse registration order for requests
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .configure(handlers::routes)
    })
    .disable_signals()
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        signal = shutdown_signal() => {
            info!("Received {}, stopping server...", signal);
            // Let in-flight uploads finish their puts
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize tracing.
///
/// `RUST_LOG` controls what gets logged; without it the default is
/// `audio_separation_backend=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_separation_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// Resolves with the name of the first shutdown signal received (SIGTERM or SIGINT).
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        _ => {
            error!("Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return "Ctrl+C";
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}
