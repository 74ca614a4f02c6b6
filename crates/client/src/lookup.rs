//! Key lookup with deferred-key retry
//!
//! A `lookup` call may resolve only part of the requested keys and return
//! the rest as `deferred`. [`LookupRetrier`] re-requests the deferred keys
//! until none remain or [`MAX_LOOKUP_ATTEMPTS`] requests have been made.
//! Keys still pending at the cap are dropped from the result, so fewer
//! entities than keys does not imply the others do not exist.
//!
//! When the caller tracks deferred keys itself, a single request is made and
//! the deferred keys are handed back instead of retried. An error after
//! entities were resolved in that mode is returned as
//! [`ClientError::PartialLookup`], carrying those entities.

use gcdkit_core::{Entity, Key};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult, ProtocolError};
use crate::transport::Transport;

/// Hard cap on lookup requests per call
pub const MAX_LOOKUP_ATTEMPTS: usize = 128;

/// `readOptions.readConsistency` for eventually consistent reads
pub const EVENTUAL_CONSISTENCY: &str = "EVENTUAL";

/// Which secondary result lists the caller wants back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupTracking {
    /// Collect `missing` entries
    pub missing: bool,
    /// Return `deferred` keys after the first request instead of retrying
    pub deferred: bool,
}

/// Result of a lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupOutcome {
    /// Entities resolved, in server order
    pub found: Vec<Entity>,
    /// Keys reported missing (only when tracked)
    pub missing: Vec<Entity>,
    /// Keys the server deferred (only when tracked)
    pub deferred: Vec<Key>,
    /// Requests issued
    pub attempts: usize,
}

/// Builds the body of a `lookup` request
pub fn lookup_body(keys: &[Key], eventual: bool) -> JsonValue {
    let keys: Vec<JsonValue> = keys.iter().map(Key::to_json).collect();
    if eventual {
        json!({
            "readOptions": {"readConsistency": EVENTUAL_CONSISTENCY},
            "keys": keys
        })
    } else {
        json!({ "keys": keys })
    }
}

/// Resolves keys through repeated `lookup` calls
pub struct LookupRetrier<'a, T: Transport + ?Sized> {
    transport: &'a T,
    url: String,
    eventual: bool,
    tracking: LookupTracking,
}

impl<'a, T: Transport + ?Sized> LookupRetrier<'a, T> {
    /// Retrier posting to `url`
    pub fn new(transport: &'a T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            eventual: false,
            tracking: LookupTracking::default(),
        }
    }

    /// Request eventually consistent reads
    pub fn eventual(mut self, eventual: bool) -> Self {
        self.eventual = eventual;
        self
    }

    /// Choose which secondary lists to return
    pub fn tracking(mut self, tracking: LookupTracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Resolve `keys`
    pub async fn run(&self, keys: Vec<Key>) -> ClientResult<LookupOutcome> {
        let mut outcome = LookupOutcome::default();
        let mut pending = keys;

        while !pending.is_empty() && outcome.attempts < MAX_LOOKUP_ATTEMPTS {
            outcome.attempts += 1;
            let body = lookup_body(&pending, self.eventual);
            let response = self.transport.post(&self.url, &body).await?;
            let content = response.into_success_body()?;

            let deferred = match self.absorb_round(&content, &mut outcome) {
                Ok(deferred) => deferred,
                Err(e) if self.tracking.deferred && !outcome.found.is_empty() => {
                    return Err(ClientError::PartialLookup {
                        found: std::mem::take(&mut outcome.found),
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            };

            debug!(
                target: "gcdkit::lookup",
                attempt = outcome.attempts,
                requested = pending.len(),
                found = outcome.found.len(),
                deferred = deferred.len(),
                "Lookup attempt"
            );

            if self.tracking.deferred {
                outcome.deferred = deferred;
                return Ok(outcome);
            }
            pending = deferred;
        }

        if !pending.is_empty() {
            warn!(
                target: "gcdkit::lookup",
                attempts = outcome.attempts,
                pending = pending.len(),
                "Lookup attempt limit reached with keys still deferred"
            );
        }
        Ok(outcome)
    }
}

impl<'a, T: Transport + ?Sized> LookupRetrier<'a, T> {
    /// Collect `found` and `missing` (when tracked), then parse `deferred`
    fn absorb_round(
        &self,
        content: &JsonValue,
        outcome: &mut LookupOutcome,
    ) -> ClientResult<Vec<Key>> {
        for result in results(content, "found")? {
            outcome.found.push(entity_of(result)?);
        }

        if self.tracking.missing {
            for result in results(content, "missing")? {
                outcome.missing.push(entity_of(result)?);
            }
        }

        Ok(results(content, "deferred")?
            .iter()
            .map(Key::from_json)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

fn results<'v>(content: &'v JsonValue, field: &str) -> Result<&'v [JsonValue], ProtocolError> {
    match content.get(field) {
        None | Some(JsonValue::Null) => Ok(&[]),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(other) => Err(ProtocolError::MalformedResponse(format!(
            "lookup: \"{}\" is not a list: {}",
            field, other
        ))),
    }
}

fn entity_of(result: &JsonValue) -> ClientResult<Entity> {
    let entity = result.get("entity").ok_or_else(|| {
        ProtocolError::MalformedResponse("lookup: result without \"entity\"".to_string())
    })?;
    Ok(Entity::from_json(entity)?)
}
