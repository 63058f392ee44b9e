//! pt-daemon entry point.
//!
//! Thin by intent: load config, set up tracing, build the shared state, wire
//! middleware, and start the HTTP server. Route handlers live in `routes.rs`;
//! config-to-state wiring lives in `bootstrap.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use pt_config::secrets::resolve_secrets;
use pt_config::{report_unused_keys, ServiceConfig};
use pt_daemon::{bootstrap, routes};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = pt_config::load_from_env().context("config load failed")?;
    let cfg = ServiceConfig::from_loaded(&loaded)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let unused = report_unused_keys(&loaded.config_json, cfg.config.unused_keys)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "config has unused keys");
    }

    let secrets = resolve_secrets(&cfg)?;
    let shared = Arc::new(bootstrap::build_state(&cfg, &secrets, loaded.config_hash).await?);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors(&cfg.server.cors_allowed_origins));

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid server.bind_addr: {}", cfg.server.bind_addr))?,
    };
    info!("pt-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("PT_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

/// CORS: exact origins from `server.cors_allowed_origins`.
fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
