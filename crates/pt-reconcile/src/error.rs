use pt_db::StoreError;
use pt_portfolio::Rejection;
use rust_decimal::Decimal;

/// Every way a ledger operation can fail.
///
/// `InvalidQuantity`, `InsufficientFunds` and `InsufficientHoldings` are
/// business rejections: nothing was written and retrying will not help.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Quantity must be positive")]
    InvalidQuantity { quantity: Decimal },

    #[error("Insufficient balance")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    #[error("Insufficient shares")]
    InsufficientHoldings { owned: Decimal, requested: Decimal },

    #[error("User not found")]
    NotFound { account_id: String },

    #[error("Account already exists")]
    AlreadyExists { account_id: String },

    #[error("Could not fetch price for symbol")]
    QuoteUnavailable { symbol: String, reason: String },

    #[error("Ledger store failure: {0}")]
    StoreFailure(String),
}

impl TradeError {
    /// Stable machine-readable kind, e.g. for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TradeError::MissingField(_) => "missing_field",
            TradeError::InvalidQuantity { .. } => "invalid_quantity",
            TradeError::InsufficientFunds { .. } => "insufficient_funds",
            TradeError::InsufficientHoldings { .. } => "insufficient_holdings",
            TradeError::NotFound { .. } => "not_found",
            TradeError::AlreadyExists { .. } => "already_exists",
            TradeError::QuoteUnavailable { .. } => "quote_unavailable",
            TradeError::StoreFailure(_) => "store_failure",
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TradeError::InvalidQuantity { .. }
                | TradeError::InsufficientFunds { .. }
                | TradeError::InsufficientHoldings { .. }
        )
    }
}

impl From<Rejection> for TradeError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::InvalidQuantity { quantity } => TradeError::InvalidQuantity { quantity },
            Rejection::InsufficientFunds { balance, required } => {
                TradeError::InsufficientFunds { balance, required }
            }
            Rejection::InsufficientHoldings { owned, requested } => {
                TradeError::InsufficientHoldings { owned, requested }
            }
        }
    }
}

impl From<StoreError> for TradeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists { account_id } => TradeError::AlreadyExists { account_id },
            StoreError::NotFound { account_id } => TradeError::NotFound { account_id },
            other => TradeError::StoreFailure(other.to_string()),
        }
    }
}
