use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-user account document as held by the ledger store.
///
/// Numeric fields are optional: documents written by older clients may omit
/// them. Readers go through the `*_or_zero` accessors so a missing field is
/// always reported as zero, never as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub profit: Option<Decimal>,
    #[serde(default)]
    pub loss: Option<Decimal>,
    /// Store-managed write counter. Bumped on every committed trade; used as
    /// the compare-and-swap token for the read-validate-write cycle.
    #[serde(default)]
    pub revision: u64,
}

impl Account {
    pub fn balance_or_zero(&self) -> Decimal {
        self.balance.unwrap_or(Decimal::ZERO)
    }

    pub fn profit_or_zero(&self) -> Decimal {
        self.profit.unwrap_or(Decimal::ZERO)
    }

    pub fn loss_or_zero(&self) -> Decimal {
        self.loss.unwrap_or(Decimal::ZERO)
    }

    /// Client-facing view with every numeric field defaulted.
    pub fn summary(&self) -> AccountSummary {
        let profit = self.profit_or_zero();
        let loss = self.loss_or_zero();
        AccountSummary {
            name: self.name.clone().unwrap_or_default(),
            balance: self.balance_or_zero(),
            profit,
            loss,
            pl: profit - loss,
        }
    }
}

/// Balance query response: display name, cash and profit/loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub name: String,
    pub balance: Decimal,
    pub profit: Decimal,
    pub loss: Decimal,
    /// Net profit/loss (`profit - loss`).
    pub pl: Decimal,
}

/// Registration input for a fresh account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub account_id: String,
    pub name: String,
    pub email: Option<String>,
    pub starting_balance: Decimal,
}

impl NewAccount {
    /// The account document as first written: starting cash, zero profit/loss.
    pub fn into_account(self) -> Account {
        Account {
            account_id: self.account_id,
            name: Some(self.name),
            email: self.email,
            balance: Some(self.starting_balance),
            profit: Some(Decimal::ZERO),
            loss: Some(Decimal::ZERO),
            revision: 0,
        }
    }
}

/// Field-level account update.
///
/// Each operation names exactly the fields it is allowed to change; `None`
/// leaves the stored value untouched. A sell, for instance, only ever sets
/// `balance`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    pub balance: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub loss: Option<Decimal>,
}

impl AccountUpdate {
    pub fn balance_only(balance: Decimal) -> Self {
        Self {
            balance: Some(balance),
            ..Self::default()
        }
    }

    /// Apply to an in-memory account document (does not touch `revision`).
    pub fn apply_to(&self, acct: &mut Account) {
        if let Some(b) = self.balance {
            acct.balance = Some(b);
        }
        if let Some(p) = self.profit {
            acct.profit = Some(p);
        }
        if let Some(l) = self.loss {
            acct.loss = Some(l);
        }
    }
}
