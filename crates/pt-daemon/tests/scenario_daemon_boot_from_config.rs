//! Scenario: Daemon state is built from layered config
//!
//! # Invariants under test
//!
//! 1. A memory/fixed config boots a working daemon: registration and a buy
//!    go through and the status route reports the config hash.
//!
//! 2. Engine settings (P/L policy, timeout, retries, starting balance) and
//!    cache settings come from config.
//!
//! 3. The postgres backend never boots without its database URL, and the
//!    error names the env var, not a value.
//!
//! All tests are pure in-process; no DB or network required.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use pt_config::secrets::{resolve_secrets, ResolvedSecrets};
use pt_config::{load_layered_yaml_from_strings, LoadedConfig, ServiceConfig};
use pt_daemon::{bootstrap, routes, state::AppState};
use rust_decimal_macros::dec;
use tower::ServiceExt; // oneshot

const OFFLINE_YAML: &str = r#"
quotes:
  provider: fixed
  timeout_ms: 750
  cache_ttl_secs: 5
  fixed_prices:
    AAPL: 150
ledger:
  backend: memory
  starting_balance: 2500
  pnl_policy: accumulate
  max_commit_retries: 9
"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load(yaml: &str) -> (LoadedConfig, ServiceConfig) {
    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("test yaml must parse cleanly");
    let cfg = ServiceConfig::from_loaded(&loaded).expect("test yaml must validate");
    (loaded, cfg)
}

async fn boot(yaml: &str) -> (LoadedConfig, Arc<AppState>) {
    let (loaded, cfg) = load(yaml);
    let secrets = resolve_secrets(&cfg).unwrap();
    let st = bootstrap::build_state(&cfg, &secrets, loaded.config_hash.clone())
        .await
        .unwrap();
    (loaded, Arc::new(st))
}

async fn call(st: &Arc<AppState>, req: Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, serde_json::from_slice(&body).expect("body is not valid JSON"))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// 1: Offline boot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offline_config_boots_a_working_daemon() {
    let (loaded, st) = boot(OFFLINE_YAML).await;

    let (status, json) = call(
        &st,
        post_json("/v1/accounts", serde_json::json!({"account_id": "u1", "name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["balance"].as_f64(), Some(2500.0));

    let (status, json) = call(
        &st,
        post_json(
            "/v1/trade/buy",
            serde_json::json!({"account_id": "u1", "symbol": "AAPL", "quantity": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["balance"].as_f64(), Some(2200.0));

    let req = Request::builder()
        .uri("/v1/status")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = call(&st, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config_hash"], loaded.config_hash.as_str());
    assert_eq!(json["ledger_backend"], "memory");
    assert_eq!(json["quote_provider"], "fixed");
}

// ---------------------------------------------------------------------------
// 2: Settings flow through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn engine_and_cache_settings_come_from_config() {
    let (_, st) = boot(OFFLINE_YAML).await;
    let ec = st.engine.config();
    assert_eq!(ec.pnl_policy.as_str(), "accumulate");
    assert_eq!(ec.quote_timeout, Duration::from_millis(750));
    assert_eq!(ec.max_commit_retries, 9);
    assert_eq!(ec.starting_balance, dec!(2500));
    assert_eq!(st.quote_cache.ttl(), Duration::from_secs(5));
}

#[tokio::test]
async fn default_config_uses_yahoo_and_memory() {
    let (_, cfg) = load("");
    let quotes = bootstrap::quote_provider(&cfg.quotes).unwrap();
    assert_eq!(quotes.name(), "yahoo");

    let store = bootstrap::ledger_store(&cfg.ledger, &ResolvedSecrets::default())
        .await
        .unwrap();
    assert_eq!(store.backend(), "memory");
}

// ---------------------------------------------------------------------------
// 3: Postgres needs its URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn postgres_backend_without_url_does_not_boot() {
    let (_, cfg) = load(
        r#"
ledger:
  backend: postgres
  postgres:
    url_env: "PT_SENTINEL_BOOT_DB_URL_NEVER_SET_91C2"
"#,
    );

    let err = resolve_secrets(&cfg).unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"), "{err}");

    let err = match bootstrap::ledger_store(&cfg.ledger, &ResolvedSecrets::default()).await {
        Ok(_) => panic!("postgres store built without a URL"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("PT_SENTINEL_BOOT_DB_URL_NEVER_SET_91C2"), "{err}");
}
