//! Top-level error wrapper types.

use crate::{ConfigError, GeneratorError, LedgerError, PipelineError, StorageError};

/// Every error family the workspace can produce.
///
/// # Examples
///
/// ```
/// use manzai_error::{ManzaiError, StorageError, StorageErrorKind};
///
/// let err: ManzaiError = StorageError::new(StorageErrorKind::Unavailable("down".into())).into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ManzaiErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Text generator error
    #[from(GeneratorError)]
    Generator(GeneratorError),
    /// Row store error
    #[from(StorageError)]
    Storage(StorageError),
    /// Credit ledger error
    #[from(LedgerError)]
    Ledger(LedgerError),
    /// Generation pipeline error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Manzai error with kind discrimination.
///
/// # Examples
///
/// ```
/// use manzai_error::{ManzaiResult, ConfigError};
///
/// fn might_fail() -> ManzaiResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Manzai Error: {}", _0)]
pub struct ManzaiError(Box<ManzaiErrorKind>);

impl ManzaiError {
    /// Create a new error from a kind.
    pub fn new(kind: ManzaiErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ManzaiErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ManzaiErrorKind
impl<T> From<T> for ManzaiError
where
    T: Into<ManzaiErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for manzai operations.
pub type ManzaiResult<T> = std::result::Result<T, ManzaiError>;
