//! Errors reported by a table store.
//!
//! Remote failures are classified by the DynamoDB error code they carry so
//! callers can decide which ones to recover from.

use std::fmt;

/// Well-known DynamoDB error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum StoreErrorCode {
    /// Table is being created, updated or deleted, or already exists.
    ResourceInUse,
    /// Table not found.
    ResourceNotFound,
    /// Condition check failed.
    ConditionalCheckFailed,
    /// Request failed validation.
    Validation,
    /// Throughput or request rate exceeded.
    Throttling,
    /// Internal server error.
    Internal,
    /// Anything else, including transport failures.
    #[default]
    Unknown,
}

impl StoreErrorCode {
    /// Classify an error code string as returned by the service.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "ResourceInUseException" => Self::ResourceInUse,
            "ResourceNotFoundException" => Self::ResourceNotFound,
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailed,
            "ValidationException" => Self::Validation,
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "RequestLimitExceeded" => Self::Throttling,
            "InternalServerError" => Self::Internal,
            _ => Self::Unknown,
        }
    }

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUse => "ResourceInUseException",
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::ConditionalCheckFailed => "ConditionalCheckFailedException",
            Self::Validation => "ValidationException",
            Self::Throttling => "ThrottlingException",
            Self::Internal => "InternalServerError",
            Self::Unknown => "UnknownError",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a table store.
#[derive(Debug)]
pub struct StoreError {
    /// The error class.
    pub code: StoreErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl StoreError {
    /// Create a new `StoreError` with a custom message.
    #[must_use]
    pub fn with_message(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the error carries the given code.
    #[must_use]
    pub fn is(&self, code: StoreErrorCode) -> bool {
        self.code == code
    }

    // -- Convenience constructors --

    /// Table is busy or already exists.
    #[must_use]
    pub fn resource_in_use(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::ResourceInUse, message)
    }

    /// Table not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::ResourceNotFound, message)
    }

    /// Condition expression evaluated to false.
    #[must_use]
    pub fn conditional_check_failed(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::ConditionalCheckFailed, message)
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::Validation, message)
    }
}
