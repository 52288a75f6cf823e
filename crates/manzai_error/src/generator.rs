//! Text generator (LLM provider) error types and retry classification.

/// Error conditions raised while talking to a text generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GeneratorErrorKind {
    /// No API key was configured for the provider
    #[display("API key not configured for provider {}", _0)]
    MissingApiKey(String),
    /// Transport-level failure (connect, timeout, TLS)
    #[display("HTTP request failed: {}", _0)]
    Http(String),
    /// Provider answered with a non-success status
    #[display("API error {}: {}", status, message)]
    Api {
        /// HTTP status code returned by the provider
        status: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// Response body could not be decoded
    #[display("Failed to deserialize response: {}", _0)]
    Deserialization(String),
    /// Provider returned no text
    #[display("Provider returned an empty completion")]
    EmptyResponse,
}

impl GeneratorErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeneratorErrorKind::Api { status, .. } => {
                matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            GeneratorErrorKind::Http(_) => true,
            _ => false,
        }
    }

    /// HTTP status reported by the provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GeneratorErrorKind::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Generator error with source location tracking.
///
/// # Examples
///
/// ```
/// use manzai_error::{GeneratorError, GeneratorErrorKind};
///
/// let err = GeneratorError::new(GeneratorErrorKind::EmptyResponse);
/// assert!(format!("{}", err).contains("empty completion"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generator Error: {} at line {} in {}", kind, line, file)]
pub struct GeneratorError {
    /// The kind of error that occurred
    pub kind: GeneratorErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GeneratorError {
    /// Create a new GeneratorError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GeneratorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use manzai_error::{GeneratorError, GeneratorErrorKind, RetryableError};
///
/// let err = GeneratorError::new(GeneratorErrorKind::Api {
///     status: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = GeneratorError::new(GeneratorErrorKind::Api {
///     status: 401,
///     message: "Unauthorized".to_string(),
/// });
/// assert!(!err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if the operation that produced this error may succeed on retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GeneratorError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
