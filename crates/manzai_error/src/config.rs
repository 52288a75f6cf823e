//! Configuration error types.

/// A configuration source could not be read, or a value was rejected.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Config Error: {} ({}:{})", message, file, line)]
pub struct ConfigError {
    /// What went wrong
    pub message: String,
    /// Line where the error was raised
    pub line: u32,
    /// File where the error was raised
    pub file: &'static str,
}

impl ConfigError {
    /// Error with a free-form message.
    ///
    /// # Examples
    ///
    /// ```
    /// use manzai_error::ConfigError;
    ///
    /// let err = ConfigError::new("Failed to parse manzai.toml");
    /// assert!(err.to_string().starts_with("Config Error: Failed to parse"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Error for one rejected key.
    ///
    /// ```
    /// use manzai_error::ConfigError;
    ///
    /// let err = ConfigError::invalid_field("ledger.product_id", "must not be empty");
    /// assert_eq!(err.message, "ledger.product_id must not be empty");
    /// ```
    #[track_caller]
    pub fn invalid_field(field: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(format!("{field} {reason}"))
    }
}
