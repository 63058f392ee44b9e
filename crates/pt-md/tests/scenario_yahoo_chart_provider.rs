//! Scenario: Yahoo chart provider against a local mock server
//!
//! # Invariants under test
//!
//! 1. The request carries the lookback as `range` / `interval` query params.
//! 2. The last price is the final non-null close of the window.
//! 3. An HTTP 404 is "no data" (`Ok(None)`), not an error.
//! 4. Other HTTP failures surface as `ProviderError::Api` with the status.
//! 5. A slow upstream is cut off by the bounded fetch with `Timeout`.

use std::time::Duration;

use httpmock::prelude::*;
use pt_md::{fetch_last_price_bounded, Lookback, ProviderError, QuoteProvider, YahooChartProvider};
use rust_decimal_macros::dec;
use serde_json::json;

fn provider(server: &MockServer) -> YahooChartProvider {
    YahooChartProvider::new_with_base_url(server.base_url(), Duration::from_secs(5)).unwrap()
}

fn chart_body(closes: serde_json::Value) -> serde_json::Value {
    json!({
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "currency": "USD"},
                "timestamp": [1700000000, 1700000300, 1700000600],
                "indicators": {"quote": [{"close": closes}]}
            }],
            "error": null
        }
    })
}

#[tokio::test]
async fn last_price_uses_final_non_null_close() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v8/finance/chart/AAPL")
                .query_param("range", "1d")
                .query_param("interval", "5m");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(chart_body(json!([149.5, 150.0, null])));
        })
        .await;

    let p = provider(&server);
    let got = p.get_last_price("AAPL", &Lookback::default()).await.unwrap();
    m.assert_async().await;
    assert_eq!(got, Some(dec!(150)));

    let series = p.get_series("AAPL", &Lookback::default()).await.unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].close, dec!(149.5));
}

#[tokio::test]
async fn http_404_is_no_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v8/finance/chart/ZZZZ");
            then.status(404).json_body(json!({
                "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}
            }));
        })
        .await;

    let got = provider(&server)
        .get_last_price("ZZZZ", &Lookback::default())
        .await
        .unwrap();
    assert_eq!(got, None);
}

#[tokio::test]
async fn server_error_surfaces_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v8/finance/chart/AAPL");
            then.status(503).body("unavailable");
        })
        .await;

    let err = provider(&server)
        .get_last_price("AAPL", &Lookback::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Api { code: Some(503), .. }), "{err}");
}

#[tokio::test]
async fn slow_upstream_is_bounded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v8/finance/chart/AAPL");
            then.status(200)
                .delay(Duration::from_millis(800))
                .json_body(chart_body(json!([1.0, 2.0, 3.0])));
        })
        .await;

    let p = provider(&server);
    let err = fetch_last_price_bounded(&p, "AAPL", &Lookback::default(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::Timeout { after_ms: 50 });
}
