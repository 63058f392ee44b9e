//! Typed trade requests.
//!
//! `*Payload` types mirror what the web client sends: every field optional,
//! numbers possibly quoted, legacy field names accepted as aliases. They are
//! converted into `*Order` types, which the engine accepts, via `TryFrom`.
//! Conversion is where missing and malformed fields are rejected.

use pt_schemas::money::coerce_decimal;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::TradeError;

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyPayload {
    #[serde(default, alias = "uid")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    /// Price the client saw; profit/loss is measured against it.
    #[serde(default, alias = "price")]
    pub reference_price: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellPayload {
    #[serde(default, alias = "uid")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, alias = "price")]
    pub reference_price: Option<Value>,
    #[serde(default, alias = "totalValue")]
    pub total_value: Option<Value>,
    /// Client clock, stored verbatim.
    #[serde(default)]
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    #[serde(default, alias = "uid")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Validated orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyOrder {
    pub account_id: String,
    pub symbol: String,
    /// Strictly positive.
    pub quantity: Decimal,
    /// `None` means "use the live quote", i.e. no profit/loss.
    pub reference_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellOrder {
    pub account_id: String,
    pub symbol: String,
    /// Strictly positive.
    pub quantity: Decimal,
    pub client_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub client_timestamp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOrder {
    pub account_id: String,
    pub name: String,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn required_str(v: Option<String>, field: &'static str) -> Result<String, TradeError> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(TradeError::MissingField(field))
}

fn required_quantity(v: Option<&Value>) -> Result<Decimal, TradeError> {
    let q = v
        .and_then(coerce_decimal)
        .ok_or(TradeError::MissingField("quantity"))?;
    if q <= Decimal::ZERO {
        return Err(TradeError::InvalidQuantity { quantity: q });
    }
    Ok(q)
}

/// Absent and `null` are `None`; anything else must be numeric.
fn optional_decimal(v: Option<&Value>, field: &'static str) -> Result<Option<Decimal>, TradeError> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_decimal(v)
            .map(Some)
            .ok_or(TradeError::MissingField(field)),
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl TryFrom<BuyPayload> for BuyOrder {
    type Error = TradeError;

    fn try_from(p: BuyPayload) -> Result<Self, Self::Error> {
        let account_id = required_str(p.account_id, "account_id")?;
        let symbol = required_str(p.symbol, "symbol")?;
        let quantity = required_quantity(p.quantity.as_ref())?;
        // A zero reference price is treated as absent, as older clients send 0
        // when they have no quote to show.
        let reference_price = optional_decimal(p.reference_price.as_ref(), "reference_price")?
            .filter(|r| !r.is_zero());
        if matches!(reference_price, Some(r) if r < Decimal::ZERO) {
            return Err(TradeError::MissingField("reference_price"));
        }
        Ok(Self {
            account_id,
            symbol,
            quantity,
            reference_price,
        })
    }
}

impl TryFrom<SellPayload> for SellOrder {
    type Error = TradeError;

    fn try_from(p: SellPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            account_id: required_str(p.account_id, "account_id")?,
            symbol: required_str(p.symbol, "symbol")?,
            quantity: required_quantity(p.quantity.as_ref())?,
            client_price: optional_decimal(p.reference_price.as_ref(), "reference_price")?,
            total_value: optional_decimal(p.total_value.as_ref(), "total_value")?,
            client_timestamp: p.timestamp.filter(|t| !t.is_null()),
        })
    }
}

impl TryFrom<RegisterPayload> for RegisterOrder {
    type Error = TradeError;

    fn try_from(p: RegisterPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            account_id: required_str(p.account_id, "account_id")?,
            name: required_str(p.name, "name")?,
            email: p
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn buy(v: Value) -> Result<BuyOrder, TradeError> {
        BuyOrder::try_from(serde_json::from_value::<BuyPayload>(v).unwrap())
    }

    fn sell(v: Value) -> Result<SellOrder, TradeError> {
        SellOrder::try_from(serde_json::from_value::<SellPayload>(v).unwrap())
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let o = buy(json!({"uid": "u1", "symbol": "AAPL", "quantity": "10", "price": 145})).unwrap();
        assert_eq!(o.account_id, "u1");
        assert_eq!(o.quantity, dec!(10));
        assert_eq!(o.reference_price, Some(dec!(145)));

        let s = sell(json!({
            "uid": "u1", "symbol": "AAPL", "quantity": 2,
            "price": 150.5, "totalValue": "301", "timestamp": "2024-01-02T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(s.client_price, Some(dec!(150.5)));
        assert_eq!(s.total_value, Some(dec!(301)));
        assert_eq!(s.client_timestamp, Some(json!("2024-01-02T10:00:00Z")));
    }

    #[test]
    fn missing_fields_are_named() {
        assert_eq!(
            buy(json!({"symbol": "AAPL", "quantity": 1})),
            Err(TradeError::MissingField("account_id"))
        );
        assert_eq!(
            buy(json!({"account_id": "u1", "symbol": "  ", "quantity": 1})),
            Err(TradeError::MissingField("symbol"))
        );
        assert_eq!(
            sell(json!({"account_id": "u1", "symbol": "AAPL"})).unwrap_err(),
            TradeError::MissingField("quantity")
        );
    }

    #[test]
    fn non_numeric_quantity_is_missing_field() {
        assert_eq!(
            buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": "ten"})),
            Err(TradeError::MissingField("quantity"))
        );
        assert_eq!(
            buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": true})),
            Err(TradeError::MissingField("quantity"))
        );
    }

    #[test]
    fn non_positive_quantity_is_invalid() {
        assert_eq!(
            buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": -3})),
            Err(TradeError::InvalidQuantity { quantity: dec!(-3) })
        );
        assert!(matches!(
            sell(json!({"account_id": "u1", "symbol": "AAPL", "quantity": "0"})),
            Err(TradeError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn zero_or_null_reference_price_means_live_quote() {
        let o = buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": 1, "price": 0})).unwrap();
        assert_eq!(o.reference_price, None);
        let o = buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": 1, "price": null})).unwrap();
        assert_eq!(o.reference_price, None);
        assert_eq!(
            buy(json!({"account_id": "u1", "symbol": "AAPL", "quantity": 1, "price": "abc"})),
            Err(TradeError::MissingField("reference_price"))
        );
    }

    #[test]
    fn register_requires_id_and_name() {
        let p: RegisterPayload =
            serde_json::from_value(json!({"uid": "u9", "name": "Ada", "email": ""})).unwrap();
        let o = RegisterOrder::try_from(p).unwrap();
        assert_eq!(o.account_id, "u9");
        assert_eq!(o.email, None);

        let p: RegisterPayload = serde_json::from_value(json!({"uid": "u9"})).unwrap();
        assert_eq!(
            RegisterOrder::try_from(p),
            Err(TradeError::MissingField("name"))
        );
    }
}
