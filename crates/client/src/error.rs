//! Error types for the client layer
//!
//! [`ProtocolError`] covers what the REST protocol itself can get wrong.
//! [`ClientError`] is what every client operation returns; it wraps protocol,
//! key and value errors plus failures reported by the transport.

use gcdkit_core::{Entity, KeyError, ValueError};
use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Protocol-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// `moreResults` held a value outside the known set
    #[error("unexpected value for \"moreResults\": {0}")]
    UnexpectedStatus(String),

    /// Non-success HTTP status
    #[error("request failed: {message} ({status})")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Error text from the response body, or "unknown"
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Query did not finish within the configured number of pages
    #[error("query did not finish after {pages} pages")]
    PageLimitExceeded {
        /// Pages fetched before giving up
        pages: usize,
    },

    /// Caller passed an argument the operation cannot accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors returned by client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Protocol-level failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key in a request or response could not be built or read
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Entity or property value in a response could not be read
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The transport failed before producing a response
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// A lookup with caller-tracked deferred keys failed after resolving
    /// some entities
    #[error("lookup failed after resolving {} entities: {source}", .found.len())]
    PartialLookup {
        /// Entities resolved before the failure
        found: Vec<Entity>,
        /// The failure
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Shorthand for a transport failure
    pub fn transport(detail: impl Into<String>) -> Self {
        ClientError::Transport(detail.into())
    }

    /// Protocol error carried by this error, if any
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            ClientError::Protocol(e) => Some(e),
            ClientError::PartialLookup { source, .. } => source.as_protocol(),
            _ => None,
        }
    }
}
