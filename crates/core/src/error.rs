//! Error types for the key codec
//!
//! Each layer gets its own enum so callers can tell an encode failure from a
//! corrupt key string or a malformed structured key. All of them use
//! `thiserror` for `Display` and `Error`.

use thiserror::Error;

/// Result type alias for encode operations
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Result type alias for decode operations
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Failures while writing the binary key format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Integer does not fit the declared varint width
    #[error("int{bits} overflow: {value}")]
    Overflow {
        /// Value that was rejected
        value: i64,
        /// Declared width (32 or 64)
        bits: u8,
    },
}

/// Failures while reading the binary key format or its string form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before a varint or a length-prefixed field was complete
    #[error("truncated")]
    Truncated,

    /// Invalid tag, unterminated varint or out-of-range value
    #[error("corrupted: {0}")]
    Corrupted(String),

    /// A path element ended without both a kind and an identifier
    #[error("path element is missing its kind or identifier")]
    IncompletePathElement,

    /// A length-prefixed string was not valid UTF-8
    #[error("invalid UTF-8 in prefixed string")]
    InvalidUtf8,

    /// The key string is not valid base64
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// The key string never carried a path field
    #[error("key string has no path")]
    MissingPath,
}

impl DecodeError {
    /// Shorthand for a `Corrupted` error with a description
    pub fn corrupted(detail: impl Into<String>) -> Self {
        DecodeError::Corrupted(detail.into())
    }
}

/// Failures while building a key or reading its structured form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A key needs at least one path element
    #[error("key path cannot be empty")]
    EmptyPath,

    /// The key is a root key and has no parent
    #[error("root key has no parent")]
    NoParent,

    /// Path arguments must come in (kind, identifier) pairs
    #[error("path arguments must come in (kind, identifier) pairs")]
    OddPairs,

    /// A numeric id could not be parsed as a signed 64-bit integer
    #[error("invalid numeric id: {0:?}")]
    InvalidId(String),

    /// Path element had neither `id` nor `name` under the rejecting policy
    #[error("path element of kind {kind:?} has neither id nor name")]
    MissingIdentifier {
        /// Kind of the offending element
        kind: String,
    },

    /// A required field is absent from the structured form
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Binary encoding failed
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Key string could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failures while converting property values to or from their REST form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The JSON object is not a known value encoding
    #[error("unexpected or unsupported value: {0}")]
    Unsupported(String),

    /// `integerValue` did not hold a decimal i64
    #[error("invalid integer value: {0:?}")]
    InvalidInteger(String),

    /// `blobValue` was not valid base64
    #[error("invalid blob value: {0}")]
    InvalidBlob(String),

    /// Entity JSON was missing a required field
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Embedded key could not be read
    #[error(transparent)]
    Key(#[from] KeyError),
}
