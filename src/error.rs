use std::fmt;

/// The main error type for fitgate operations.
///
/// These are the abstract error kinds surfaced to callers; the embedding
/// application maps them to transport-level responses. Business denials
/// (e.g. a refused check-in) are *not* errors; they are successful
/// operations producing a denial result.
#[derive(Debug, thiserror::Error)]
pub enum FitgateError {
    /// A referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness, capacity, or state conflict blocks the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A finite entry quota is exhausted.
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// An input is outside its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl FitgateError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn quota_exhausted(msg: impl Into<String>) -> Self {
        Self::QuotaExhausted(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The stable kind for this error, useful for structured logging and
    /// for callers that key transport mappings off a string.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::QuotaExhausted(_) => ErrorKind::QuotaExhausted,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Internal(_) | Self::Anyhow(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error reflects a problem with the caller's request
    /// rather than a fault in the system.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

/// Coarse classification of a [`FitgateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    QuotaExhausted,
    InvalidArgument,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::QuotaExhausted => "quota_exhausted",
            Self::InvalidArgument => "invalid_argument",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type alias for fitgate operations.
pub type Result<T> = std::result::Result<T, FitgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_and_display() {
        let err = FitgateError::not_found("Member not found");
        assert!(matches!(err, FitgateError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Member not found");

        let err = FitgateError::conflict("Class is full");
        assert_eq!(err.to_string(), "Conflict: Class is full");

        let err = FitgateError::quota_exhausted("No remaining entries");
        assert_eq!(err.to_string(), "Quota exhausted: No remaining entries");

        let err = FitgateError::invalid_argument("days out of range");
        assert_eq!(err.to_string(), "Invalid argument: days out of range");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(FitgateError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(FitgateError::conflict("x").kind(), ErrorKind::Conflict);
        assert_eq!(FitgateError::internal("x").kind(), ErrorKind::Internal);

        let anyhow_err = anyhow::anyhow!("boom");
        let err: FitgateError = anyhow_err.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.is_client_error());
        assert!(FitgateError::conflict("x").is_client_error());
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::QuotaExhausted.as_str(), "quota_exhausted");
        assert_eq!(ErrorKind::InvalidArgument.to_string(), "invalid_argument");
    }
}
