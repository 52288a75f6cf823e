//! Credit ledger error types.

/// Client-facing ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum LedgerErrorKind {
    /// The request carried no user identifier
    #[display("bad params: user_id required")]
    MissingUserId,
    /// The product identifier is not on the allow-list
    #[display("unsupported product_id: {}", _0)]
    UnsupportedProduct(String),
    /// No row store is configured, so balances cannot change
    #[display("credit store not configured")]
    StoreNotConfigured,
}

/// Ledger error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Ledger Error: {} at line {} in {}", kind, line, file)]
pub struct LedgerError {
    /// The kind of error that occurred
    pub kind: LedgerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl LedgerError {
    /// Create a new ledger error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LedgerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
