use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::money::coerce_decimal;

/// BUY or SELL. A trade carries exactly one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Client-supplied context carried verbatim on a sell record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SellContext {
    /// Quantity as originally requested by the client.
    pub requested_quantity: Decimal,
    /// Price the client displayed when it submitted the sell.
    pub client_price: Option<Decimal>,
    /// Total value the client displayed.
    pub total_value: Option<Decimal>,
    /// Client clock, opaque.
    pub client_timestamp: Option<Value>,
}

/// An executed trade, as written to the ledger. Immutable once appended.
///
/// `live_price` is the quote the trade executed at. Buy records also carry
/// the client's reference price and the profit/loss attributed to it; sell
/// records carry the client-side context of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub live_price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pl: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<Value>,
}

impl TradeRecord {
    pub fn buy<S: Into<String>>(
        symbol: S,
        quantity: Decimal,
        live_price: Decimal,
        reference_price: Decimal,
        profit: Decimal,
        loss: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Buy,
            quantity,
            live_price,
            reference_price: Some(reference_price),
            profit: Some(profit),
            loss: Some(loss),
            pl: Some(profit - loss),
            requested_quantity: None,
            client_price: None,
            total_value: None,
            client_timestamp: None,
        }
    }

    pub fn sell<S: Into<String>>(
        symbol: S,
        quantity: Decimal,
        live_price: Decimal,
        ctx: SellContext,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: Side::Sell,
            quantity,
            live_price,
            reference_price: None,
            profit: None,
            loss: None,
            pl: None,
            requested_quantity: Some(ctx.requested_quantity),
            client_price: ctx.client_price,
            total_value: ctx.total_value,
            client_timestamp: ctx.client_timestamp,
        }
    }

    /// Document form written to the store.
    ///
    /// Besides the `side` tag the document carries the boolean `buy` / `sell`
    /// flag older clients read.
    pub fn to_doc(&self) -> serde_json::Result<Value> {
        let mut doc = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut doc {
            map.insert(self.side.as_str().to_string(), Value::Bool(true));
        }
        Ok(doc)
    }
}

/// A trade document as read back from the store.
///
/// Reads are lenient: the document may predate [`TradeRecord`] and tag its
/// side only through `buy` / `sell` flags, or carry a quantity as a string.
/// [`StoredTrade::side`] and [`StoredTrade::quantity`] return `None` for
/// documents that cannot be interpreted; replay code skips those.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrade {
    pub trade_id: Uuid,
    pub symbol: String,
    /// Server timestamp assigned when the trade was appended.
    pub recorded_at: DateTime<Utc>,
    pub doc: Value,
}

impl StoredTrade {
    /// The trade's side, or `None` when untagged or tagged both ways.
    pub fn side(&self) -> Option<Side> {
        let tagged = self
            .doc
            .get("side")
            .and_then(Value::as_str)
            .and_then(Side::parse);
        let buy = self.flag("buy");
        let sell = self.flag("sell");

        match (tagged, buy, sell) {
            (Some(Side::Buy), _, false) => Some(Side::Buy),
            (Some(Side::Sell), false, _) => Some(Side::Sell),
            (Some(_), _, _) => None,
            (None, true, false) => Some(Side::Buy),
            (None, false, true) => Some(Side::Sell),
            (None, _, _) => None,
        }
    }

    /// Strictly positive quantity, or `None` when missing or malformed.
    pub fn quantity(&self) -> Option<Decimal> {
        self.doc
            .get("quantity")
            .and_then(coerce_decimal)
            .filter(|q| *q > Decimal::ZERO)
    }

    /// Client-facing JSON: the stored document plus `trade_id` and
    /// `recorded_at` (RFC 3339).
    pub fn to_json(&self) -> Value {
        let mut map = match &self.doc {
            Value::Object(m) => m.clone(),
            other => {
                let mut m = Map::new();
                m.insert("doc".to_string(), other.clone());
                m
            }
        };
        map.insert("trade_id".to_string(), Value::String(self.trade_id.to_string()));
        map.insert(
            "recorded_at".to_string(),
            Value::String(self.recorded_at.to_rfc3339()),
        );
        Value::Object(map)
    }

    fn flag(&self, name: &str) -> bool {
        self.doc.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}
