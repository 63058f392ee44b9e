//! Axum router and all HTTP handlers for pt-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers translate wire payloads into engine orders and
//! engine errors into `{ error, .. }` bodies with the matching status.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pt_md::fetch_series_bounded;
use pt_reconcile::{
    BuyOrder, BuyPayload, RegisterOrder, RegisterPayload, SellOrder, SellPayload, TradeError,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    api_types::{
        AccountQuery, BuyResponse, ErrorResponse, HealthResponse, HoldingsResponse, LivePrice,
        LivePricesRequest, RegisterResponse, SellResponse, SeriesQuery, SeriesResponse,
        StatusResponse,
    },
    state::{uptime_secs, AppState},
};

/// Label format of intraday series points.
pub const SERIES_LABEL_FORMAT: &str = "%H:%M";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/accounts", post(register))
        .route("/v1/accounts/balance", get(balance))
        .route("/v1/trade/buy", post(trade_buy))
        .route("/v1/trade/sell", post(trade_sell))
        .route("/v1/portfolio/trades", get(portfolio_trades))
        .route("/v1/portfolio/chart-data", get(portfolio_chart))
        .route("/v1/portfolio/holdings", get(portfolio_holdings))
        .route("/v1/market/live-prices", post(live_prices))
        .route("/v1/market/series", get(market_series))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error half of every handler result.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

pub fn status_for(e: &TradeError) -> StatusCode {
    match e {
        TradeError::MissingField(_) | TradeError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        TradeError::InsufficientFunds { .. } | TradeError::InsufficientHoldings { .. } => {
            StatusCode::FORBIDDEN
        }
        TradeError::NotFound { .. } => StatusCode::NOT_FOUND,
        TradeError::AlreadyExists { .. } => StatusCode::CONFLICT,
        TradeError::QuoteUnavailable { .. } | TradeError::StoreFailure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<TradeError> for ApiError {
    fn from(e: TradeError) -> Self {
        let status = status_for(&e);
        if status.is_server_error() {
            error!(kind = e.kind(), error = ?e, "request failed");
        }
        let mut body = ErrorResponse::message(e.to_string());
        match e {
            TradeError::InsufficientFunds { balance, required } => {
                body.balance = Some(balance);
                body.required = Some(required);
            }
            TradeError::InsufficientHoldings { owned, requested } => {
                body.owned = Some(owned);
                body.requested = Some(requested);
            }
            _ => {}
        }
        Self { status, body }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::message(r.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn required_param(v: Option<String>, field: &'static str) -> Result<String, TradeError> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(TradeError::MissingField(field))
}

// ---------------------------------------------------------------------------
// GET /v1/health  /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        daemon_uptime_secs: uptime_secs(),
        config_hash: st.config_hash.clone(),
        ledger_backend: st.engine.store().backend(),
        quote_provider: st.quotes().name(),
        quote_cache_entries: st.quote_cache.len(),
    })
}

// ---------------------------------------------------------------------------
// /v1/accounts
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(payload) = payload?;
    let order = RegisterOrder::try_from(payload)?;
    let acct = st.engine.register(order).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            balance: acct.balance_or_zero(),
            account_id: acct.account_id,
        }),
    ))
}

pub(crate) async fn balance(
    State(st): State<Arc<AppState>>,
    Query(q): Query<AccountQuery>,
) -> ApiResult<Response> {
    let account_id = required_param(q.account_id, "account_id")?;
    let summary = st.engine.balance(&account_id).await?;
    Ok(Json(summary).into_response())
}

// ---------------------------------------------------------------------------
// POST /v1/trade/buy  /v1/trade/sell
// ---------------------------------------------------------------------------

pub(crate) async fn trade_buy(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<BuyPayload>, JsonRejection>,
) -> ApiResult<Json<BuyResponse>> {
    let Json(payload) = payload?;
    let order = BuyOrder::try_from(payload)?;
    let r = st.engine.buy(&order).await.inspect_err(|e| {
        if e.is_rejection() {
            info!(account_id = %order.account_id, symbol = %order.symbol, kind = e.kind(), "buy rejected");
        }
    })?;
    Ok(Json(BuyResponse {
        trade_id: r.trade_id,
        balance: r.balance,
        total_cost: r.total_cost,
        live_price: r.live_price,
    }))
}

pub(crate) async fn trade_sell(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<SellPayload>, JsonRejection>,
) -> ApiResult<Json<SellResponse>> {
    let Json(payload) = payload?;
    let order = SellOrder::try_from(payload)?;
    let r = st.engine.sell(&order).await.inspect_err(|e| {
        if e.is_rejection() {
            info!(account_id = %order.account_id, symbol = %order.symbol, kind = e.kind(), "sell rejected");
        }
    })?;
    Ok(Json(SellResponse {
        trade_id: r.trade_id,
        balance: r.balance,
        sale_value: r.sale_value,
        live_price: r.live_price,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/portfolio/*
// ---------------------------------------------------------------------------

pub(crate) async fn portfolio_trades(
    State(st): State<Arc<AppState>>,
    Query(q): Query<AccountQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let account_id = required_param(q.account_id, "account_id")?;
    let trades = st.engine.trades(&account_id).await?;
    Ok(Json(trades.iter().map(|t| t.to_json()).collect()))
}

pub(crate) async fn portfolio_chart(
    State(st): State<Arc<AppState>>,
    Query(q): Query<AccountQuery>,
) -> ApiResult<Response> {
    let account_id = required_param(q.account_id, "account_id")?;
    let chart = st.engine.chart(&account_id).await?;
    Ok(Json(chart).into_response())
}

pub(crate) async fn portfolio_holdings(
    State(st): State<Arc<AppState>>,
    Query(q): Query<AccountQuery>,
) -> ApiResult<Json<HoldingsResponse>> {
    let account_id = required_param(q.account_id, "account_id")?;
    let holdings = st.engine.holdings(&account_id).await?;
    Ok(Json(HoldingsResponse { holdings }))
}

// ---------------------------------------------------------------------------
// /v1/market/*
// ---------------------------------------------------------------------------

/// One price per requested symbol, in request order. A symbol whose quote
/// cannot be fetched gets `price: null`; the request itself still succeeds.
pub(crate) async fn live_prices(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<LivePricesRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<LivePrice>>> {
    let Json(req) = payload?;
    let symbols: Vec<String> = req
        .symbols
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(TradeError::MissingField("symbols").into());
    }

    let mut set = tokio::task::JoinSet::new();
    for (i, symbol) in symbols.iter().cloned().enumerate() {
        let st = Arc::clone(&st);
        set.spawn(async move {
            let price = cached_price(&st, &symbol).await;
            (i, price)
        });
    }

    let mut prices: Vec<Option<Decimal>> = vec![None; symbols.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((i, price)) => prices[i] = price,
            Err(e) => warn!(error = %e, "live price task failed"),
        }
    }

    Ok(Json(
        symbols
            .into_iter()
            .zip(prices)
            .map(|(symbol, price)| LivePrice { symbol, price })
            .collect(),
    ))
}

async fn cached_price(st: &AppState, symbol: &str) -> Option<Decimal> {
    match st
        .quote_cache
        .get_or_fetch(st.quotes(), symbol, st.lookback(), st.quote_timeout())
        .await
    {
        Ok(Some(p)) if p > Decimal::ZERO => Some(p),
        Ok(_) => None,
        Err(e) => {
            warn!(symbol, error = %e, "live price unavailable");
            None
        }
    }
}

pub(crate) async fn market_series(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SeriesQuery>,
) -> ApiResult<Json<SeriesResponse>> {
    let symbol = required_param(q.symbol, "symbol")?;
    let points = fetch_series_bounded(st.quotes(), &symbol, st.lookback(), st.quote_timeout())
        .await
        .map_err(|e| TradeError::QuoteUnavailable {
            symbol: symbol.clone(),
            reason: e.to_string(),
        })?;

    let (labels, prices) = points
        .iter()
        .map(|p| (p.ts.format(SERIES_LABEL_FORMAT).to_string(), p.close))
        .unzip();
    Ok(Json(SeriesResponse {
        symbol,
        labels,
        prices,
    }))
}
