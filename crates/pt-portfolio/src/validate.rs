//! Trade validation against authoritative account state.
//!
//! Callers pass in the balance and held quantity they just re-read from the
//! ledger store, never values supplied by the client. A rejection carries the
//! numbers the client needs to explain the refusal.

use pt_schemas::money::round2;
use rust_decimal::Decimal;

/// Business-rule refusal of a requested trade. Not a system fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Requested quantity is zero or negative.
    InvalidQuantity { quantity: Decimal },
    /// `price × quantity` exceeds the cash balance. `required` is rounded to cents.
    InsufficientFunds { balance: Decimal, required: Decimal },
    /// Requested sell quantity exceeds the replayed position.
    InsufficientHoldings { owned: Decimal, requested: Decimal },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity { quantity } => {
                write!(f, "quantity must be positive, got {quantity}")
            }
            Self::InsufficientFunds { balance, required } => {
                write!(f, "insufficient balance: have {balance}, need {required}")
            }
            Self::InsufficientHoldings { owned, requested } => {
                write!(f, "insufficient shares: own {owned}, requested {requested}")
            }
        }
    }
}

impl std::error::Error for Rejection {}

/// Result of an approved buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyApproval {
    /// Unrounded `price × quantity`.
    pub total_cost: Decimal,
}

pub fn validate_quantity(quantity: Decimal) -> Result<(), Rejection> {
    if quantity <= Decimal::ZERO {
        return Err(Rejection::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Buy path: the full cost at `price` must be covered by `balance`.
pub fn validate_buy(
    balance: Decimal,
    price: Decimal,
    quantity: Decimal,
) -> Result<BuyApproval, Rejection> {
    validate_quantity(quantity)?;

    // An overflowing cost can never be covered.
    let Some(total_cost) = price.checked_mul(quantity) else {
        return Err(Rejection::InsufficientFunds {
            balance,
            required: Decimal::MAX,
        });
    };

    if total_cost > balance {
        return Err(Rejection::InsufficientFunds {
            balance,
            required: round2(total_cost),
        });
    }
    Ok(BuyApproval { total_cost })
}

/// Sell path: the requested quantity must not exceed what is held.
pub fn validate_sell(owned: Decimal, quantity: Decimal) -> Result<(), Rejection> {
    validate_quantity(quantity)?;
    if quantity > owned {
        return Err(Rejection::InsufficientHoldings {
            owned,
            requested: quantity,
        });
    }
    Ok(())
}
