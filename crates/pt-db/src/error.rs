use std::fmt;

/// Errors a [`crate::LedgerStore`] may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `create_account` for an id that is already registered.
    AlreadyExists { account_id: String },
    /// No account with this id.
    NotFound { account_id: String },
    /// The account was written since it was read; nothing was committed.
    Conflict { expected: u64, actual: u64 },
    /// Storage backend failure (connection, SQL, serialization).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists { account_id } => {
                write!(f, "account already exists: {account_id}")
            }
            StoreError::NotFound { account_id } => write!(f, "account not found: {account_id}"),
            StoreError::Conflict { expected, actual } => write!(
                f,
                "revision conflict: expected {expected}, store has {actual}"
            ),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub(crate) fn backend(context: &str, err: impl fmt::Display) -> Self {
        StoreError::Backend(format!("{context}: {err}"))
    }
}
