use std::time::Duration;

use chrono::{TimeZone, Utc};
use pt_schemas::money::coerce_decimal;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::provider::{PricePoint, ProviderError, QuoteProvider};
use crate::Lookback;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart-API provider (`/v8/finance/chart/{symbol}`).
///
/// No API key. The HTTP client carries its own request timeout in addition to
/// the caller's bound.
#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: Url,
}

impl YahooChartProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::new_with_base_url(DEFAULT_BASE_URL.to_string(), timeout)
    }

    pub fn new_with_base_url(base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            // Yahoo rejects requests without a user agent.
            .user_agent(concat!("papertrade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Config(format!("http client build failed: {e}")))?;
        let base_url = Url::parse(&base_url)
            .map_err(|e| ProviderError::Config(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Config(format!("base url {base_url} cannot take a path")));
        }
        Ok(Self { http, base_url })
    }

    /// The symbol is a single percent-encoded path segment.
    fn build_chart_url(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", symbol]);
        }
        url
    }
}

#[async_trait::async_trait]
impl QuoteProvider for YahooChartProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn get_series(
        &self,
        symbol: &str,
        lookback: &Lookback,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let resp = self
            .http
            .get(self.build_chart_url(symbol))
            .query(&[
                ("range", lookback.range.as_str()),
                ("interval", lookback.interval.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("yahoo request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(symbol, "yahoo has no chart for symbol");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                code: Some(i64::from(status.as_u16())),
                message: format!("yahoo http error for {symbol}"),
            });
        }

        let body: ChartEnvelope = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("yahoo chart json decode failed: {e}")))?;

        parse_chart(body)
    }
}

fn parse_chart(body: ChartEnvelope) -> Result<Vec<PricePoint>, ProviderError> {
    if let Some(err) = body.chart.error {
        let code = err.code.unwrap_or_default();
        if code.eq_ignore_ascii_case("Not Found") {
            return Ok(Vec::new());
        }
        return Err(ProviderError::Api {
            code: None,
            message: format!(
                "{}: {}",
                code,
                err.description.unwrap_or_else(|| "unknown".to_string())
            ),
        });
    }

    let Some(result) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (ts, close) in result.timestamp.iter().zip(closes.iter()) {
        // Yahoo pads bars with no trades with null closes.
        let Some(close) = coerce_decimal(close) else {
            continue;
        };
        let Some(ts) = Utc.timestamp_opt(*ts, 0).single() else {
            return Err(ProviderError::Decode(format!("invalid bar timestamp {ts}")));
        };
        out.push(PricePoint { ts, close });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize)]
struct QuoteBlock {
    // Kept as raw JSON so closes keep their shortest decimal form.
    #[serde(default)]
    close: Vec<Value>,
}
