//! Row store error types.

/// Kinds of row store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Could not reach the store
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Transport failure talking to a REST store
    #[display("HTTP request failed: {}", _0)]
    Http(String),
    /// The store rejected or failed a query
    #[display("Query failed: {}", _0)]
    Query(String),
    /// A row could not be decoded
    #[display("Failed to deserialize row: {}", _0)]
    Deserialization(String),
    /// Store is configured but not usable
    #[display("Storage unavailable: {}", _0)]
    Unavailable(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use manzai_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::Query("timeout".to_string()));
/// assert!(format!("{}", err).contains("Query failed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
