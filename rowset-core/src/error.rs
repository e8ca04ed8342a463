//! Error types for rowset

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for rowset operations
#[derive(Error, Debug)]
pub enum Error {
    /// A builder or compiler precondition failed
    #[error("Parameter [{name}] is invalid: {message}")]
    InvalidArgument { name: String, message: String },

    /// The driver could not establish a connection
    #[error("Error while trying to establish connection | {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The driver connected but failed to execute the statement
    #[error("Error while executing SQL | {message}")]
    Statement {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The driver returned a result of unrecognized shape
    #[error("Invalid response from database driver: {message}")]
    InvalidResponse { message: String },

    /// A row could not be flattened into a record
    #[error("Unexpected row structure: {message}")]
    UnexpectedRowStructure { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for rowset operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap a driver error raised while connecting
    pub fn connection<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a driver error raised while executing a statement
    pub fn statement<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Statement {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Connection error without an underlying cause
    pub fn connection_message(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Statement error without an underlying cause
    pub fn statement_message(message: impl Into<String>) -> Self {
        Self::Statement {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a new unexpected row structure error
    pub fn unexpected_row(message: impl Into<String>) -> Self {
        Self::UnexpectedRowStructure {
            message: message.into(),
        }
    }

    /// Only connection failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
