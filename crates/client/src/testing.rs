//! In-memory transport for tests
//!
//! [`ScriptedTransport`] replays queued responses in order and records every
//! request it sees. Once the queue is empty it falls back to an optional
//! handler; with no handler the post fails with a transport error.
//!
//! ```ignore
//! use gcdkit_client::testing::ScriptedTransport;
//! use gcdkit_client::TransportResponse;
//!
//! let transport = ScriptedTransport::with_responses([
//!     TransportResponse::ok(serde_json::json!({"batch": {"moreResults": "NO_MORE_RESULTS"}})),
//! ]);
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::error::{ClientError, ClientResult};
use crate::transport::{Transport, TransportResponse};

type Handler = Box<dyn Fn(&str, &JsonValue) -> TransportResponse + Send + Sync>;

/// A request the transport received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Method URL
    pub url: String,
    /// JSON body
    pub body: JsonValue,
}

/// Transport that answers from a script
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    handler: Option<Handler>,
}

impl ScriptedTransport {
    /// Transport with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that replays `responses` in order
    pub fn with_responses(responses: impl IntoIterator<Item = TransportResponse>) -> Self {
        let transport = Self::new();
        transport.responses.lock().extend(responses);
        transport
    }

    /// Answer with `handler` once the queued responses run out
    pub fn respond_with<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &JsonValue) -> TransportResponse + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Queue one more response
    pub fn push(&self, response: TransportResponse) {
        self.responses.lock().push_back(response);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, body: &JsonValue) -> ClientResult<TransportResponse> {
        self.requests.lock().push(RecordedRequest {
            url: url.to_string(),
            body: body.clone(),
        });

        if let Some(response) = self.responses.lock().pop_front() {
            return Ok(response);
        }
        match &self.handler {
            Some(handler) => Ok(handler(url, body)),
            None => Err(ClientError::transport("no scripted response left")),
        }
    }
}
