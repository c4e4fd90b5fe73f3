//! Error types for the record layer.

use dynarecord_model::{StoreError, StoreErrorCode};

/// Errors surfaced by fixtures, records, migrations and assertions.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The table does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The table is mid-transition (creating, updating, deleting).
    #[error("resource busy: {0}")]
    ResourceBusy(String),

    /// A waiter ran out of attempts.
    #[error("timed out waiting for {condition} on table {table} after {attempts} attempts")]
    ResourceTimeout {
        /// Table being polled.
        table: String,
        /// Condition waited for (`table_exists`, `table_not_exists`).
        condition: &'static str,
        /// Attempts made.
        attempts: u32,
    },

    /// No item matches the requested key.
    #[error("no record in table {table} matches key {key}")]
    RecordNotFound {
        /// Table searched.
        table: String,
        /// Rendered key.
        key: String,
    },

    /// The model definition violates key or naming constraints.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A key attribute has no value.
    #[error("missing value for key attribute {attribute}")]
    KeyMissing {
        /// Exposed name of the key attribute.
        attribute: String,
    },

    /// The model has no attribute with this name.
    #[error("unknown attribute {attribute}")]
    UnknownAttribute {
        /// The requested name.
        attribute: String,
    },

    /// A value cannot be cast to the attribute's kind.
    #[error("invalid value {value} for {kind} attribute {attribute}")]
    InvalidAttributeValue {
        /// Exposed attribute name.
        attribute: String,
        /// Attribute kind (`integer_attr`, ...).
        kind: &'static str,
        /// Rendered rejected value.
        value: String,
    },

    /// A conditional write was rejected.
    #[error("conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    /// Migration options are inconsistent.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A model query named something the model does not answer.
    #[error("model does not respond to {0}")]
    UnknownModelMethod(String),

    /// An assertion against stored or in-memory state did not hold.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other remote rejection, verbatim.
    #[error("service error: {0}")]
    Service(#[source] StoreError),

    /// A value could not be converted to or from its stored form.
    #[error("attribute conversion failed: {0}")]
    Conversion(#[from] serde_dynamo::Error),
}

impl From<StoreError> for RecordError {
    fn from(err: StoreError) -> Self {
        match err.code {
            StoreErrorCode::ResourceNotFound => Self::ResourceNotFound(err.message),
            StoreErrorCode::ResourceInUse => Self::ResourceBusy(err.message),
            StoreErrorCode::ConditionalCheckFailed => Self::ConditionalCheckFailed(err.message),
            _ => Self::Service(err),
        }
    }
}

/// Convenience result type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;
