//! Network seam
//!
//! The client never speaks HTTP itself. A [`Transport`] posts a JSON body
//! to a method URL and hands back the status and decoded JSON body.
//! Authentication headers, token refresh and connection reuse all belong
//! to the implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::{ClientResult, ProtocolError};

/// Status code of a successful REST call
pub const STATUS_OK: u16 = 200;

/// Raw result of one POST
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Decoded JSON body (`Null` when the body was empty)
    pub body: JsonValue,
}

impl TransportResponse {
    /// Successful response with a body
    pub fn ok(body: JsonValue) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    /// True for a 200 response
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Body of a 200 response, or `RequestFailed` carrying the server's error text
    pub fn into_success_body(self) -> Result<JsonValue, ProtocolError> {
        if self.is_success() {
            return Ok(self.body);
        }
        let message = match self.body.get("error") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(err) => err
                .get("message")
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| err.to_string()),
            None => "unknown".to_string(),
        };
        Err(ProtocolError::RequestFailed {
            status: self.status,
            message,
        })
    }
}

/// POST capability the client drives
///
/// Implementations must attach authentication themselves. An `Err` aborts
/// the calling operation immediately; no partial results are returned.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url`
    async fn post(&self, url: &str, body: &JsonValue) -> ClientResult<TransportResponse>;
}
