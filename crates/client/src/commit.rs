//! Non-transactional commits
//!
//! Every commit is sent with mode `NON_TRANSACTIONAL`. The helpers pair each
//! mutation result with the entity or key it came from: a result that
//! carries a server-allocated key replaces the local key, and a result is
//! reported as successful unless it flags a conflict.

use gcdkit_core::{Entity, Key};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::error::{ClientResult, ProtocolError};
use crate::transport::Transport;

/// Commit mode sent with every request
pub const COMMIT_MODE: &str = "NON_TRANSACTIONAL";

/// Kind of write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    /// Create; fails if the entity exists
    Insert,
    /// Create or replace
    Upsert,
    /// Replace; fails if the entity does not exist
    Update,
    /// Remove by key
    Delete,
}

impl MutationOp {
    /// Field name of the operation in a mutation object
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Insert => "insert",
            MutationOp::Upsert => "upsert",
            MutationOp::Update => "update",
            MutationOp::Delete => "delete",
        }
    }
}

/// A single write, `{op: payload}` on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    op: MutationOp,
    payload: JsonValue,
}

impl Mutation {
    /// Mutation with a prebuilt payload
    pub fn new(op: MutationOp, payload: JsonValue) -> Self {
        Self { op, payload }
    }

    /// Insert an entity
    pub fn insert(entity: &Entity) -> Self {
        Self::new(MutationOp::Insert, entity.to_json())
    }

    /// Upsert an entity
    pub fn upsert(entity: &Entity) -> Self {
        Self::new(MutationOp::Upsert, entity.to_json())
    }

    /// Update an entity
    pub fn update(entity: &Entity) -> Self {
        Self::new(MutationOp::Update, entity.to_json())
    }

    /// Delete by key
    pub fn delete(key: &Key) -> Self {
        Self::new(MutationOp::Delete, key.to_json())
    }

    /// Operation of this mutation
    pub fn op(&self) -> MutationOp {
        self.op
    }

    /// Wire form
    pub fn to_json(&self) -> JsonValue {
        json!({ (self.op.as_str()): self.payload })
    }
}

/// Outcome of one mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationResult {
    /// Key allocated by the server, set only for incomplete keys
    pub key: Option<Key>,
    /// Entity version after the mutation
    pub version: Option<String>,
    /// The mutation lost a conflict and was not applied
    pub conflict_detected: bool,
}

impl MutationResult {
    /// Parse one entry of `mutationResults`
    pub fn from_json(value: &JsonValue) -> ClientResult<Self> {
        if !value.is_object() {
            return Err(ProtocolError::MalformedResponse(format!(
                "commit: mutation result is not an object: {}",
                value
            ))
            .into());
        }
        let key = match value.get("key") {
            Some(k) if !k.is_null() => Some(Key::from_json(k)?),
            _ => None,
        };
        let version = value.get("version").and_then(|v| match v {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let conflict_detected = value
            .get("conflictDetected")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        Ok(Self {
            key,
            version,
            conflict_detected,
        })
    }

    /// True unless a conflict was detected
    pub fn succeeded(&self) -> bool {
        !self.conflict_detected
    }
}

/// Something a mutation is built from and whose key a result may replace
pub trait Mutable {
    /// Mutation of kind `op` for this item
    fn mutation(&self, op: MutationOp) -> Mutation;

    /// Key a server-allocated key is written back to
    fn key_mut(&mut self) -> &mut Key;
}

impl Mutable for Entity {
    fn mutation(&self, op: MutationOp) -> Mutation {
        Mutation::new(op, self.to_json())
    }

    fn key_mut(&mut self) -> &mut Key {
        &mut self.key
    }
}

impl Mutable for Key {
    fn mutation(&self, op: MutationOp) -> Mutation {
        Mutation::new(op, self.to_json())
    }

    fn key_mut(&mut self) -> &mut Key {
        self
    }
}

/// Body of a `commit` request
pub fn commit_body(mutations: &[Mutation]) -> JsonValue {
    let mutations: Vec<JsonValue> = mutations.iter().map(Mutation::to_json).collect();
    json!({ "mode": COMMIT_MODE, "mutations": mutations })
}

/// Posts commits
pub struct Committer<'a, T: Transport + ?Sized> {
    transport: &'a T,
    url: String,
}

impl<'a, T: Transport + ?Sized> Committer<'a, T> {
    /// Committer posting to `url`
    pub fn new(transport: &'a T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    /// Commit `mutations` and return their results in order
    pub async fn commit(&self, mutations: &[Mutation]) -> ClientResult<Vec<MutationResult>> {
        let body = commit_body(mutations);
        let response = self.transport.post(&self.url, &body).await?;
        let content = response.into_success_body()?;

        let results = match content.get("mutationResults") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(MutationResult::from_json)
                .collect::<ClientResult<Vec<_>>>()?,
            Some(other) => {
                return Err(ProtocolError::MalformedResponse(format!(
                    "commit: \"mutationResults\" is not a list: {}",
                    other
                ))
                .into())
            }
        };

        debug!(
            target: "gcdkit::commit",
            mutations = mutations.len(),
            results = results.len(),
            conflicts = results.iter().filter(|r| r.conflict_detected).count(),
            "Commit applied"
        );
        Ok(results)
    }

    /// Apply `op` to every item; one flag per item, `false` on conflict.
    ///
    /// Items whose result carries an allocated key get that key.
    pub async fn apply<M: Mutable>(
        &self,
        op: MutationOp,
        items: &mut [M],
    ) -> ClientResult<Vec<bool>> {
        let mutations: Vec<Mutation> = items.iter().map(|item| item.mutation(op)).collect();
        let results = self.commit(&mutations).await?;

        Ok(items
            .iter_mut()
            .zip(results)
            .map(|(item, result)| {
                if let Some(key) = result.key.clone() {
                    *item.key_mut() = key;
                }
                result.succeeded()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::TransportResponse;
    use gcdkit_core::{Path, PathElement};

    const URL: &str = "http://localhost/v1/projects/p:commit";

    fn incomplete_entity() -> Entity {
        let path = Path::new(vec![PathElement::unallocated("Foo")]).unwrap();
        let mut entity = Entity::new(Key::new("p", None, path));
        entity.set_property("name", "x");
        entity
    }

    #[test]
    fn test_mutation_json() {
        let key = Key::from_pairs("p", [("Foo", 1)]).unwrap();
        assert_eq!(Mutation::delete(&key).to_json(), json!({"delete": key.to_json()}));

        let entity = Entity::new(key);
        assert_eq!(
            Mutation::upsert(&entity).to_json(),
            json!({"upsert": entity.to_json()})
        );
        assert_eq!(entity.mutation(MutationOp::Insert), Mutation::insert(&entity));
    }

    #[test]
    fn test_commit_body() {
        let key = Key::from_pairs("p", [("Foo", 1)]).unwrap();
        let body = commit_body(&[Mutation::delete(&key)]);
        assert_eq!(body["mode"], json!("NON_TRANSACTIONAL"));
        assert_eq!(body["mutations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_mutation_result_parsing() {
        let result = MutationResult::from_json(&json!({"version": "7"})).unwrap();
        assert!(result.succeeded());
        assert_eq!(result.version.as_deref(), Some("7"));
        assert!(result.key.is_none());

        let result = MutationResult::from_json(&json!({"conflictDetected": true})).unwrap();
        assert!(!result.succeeded());

        assert!(MutationResult::from_json(&json!("nope")).is_err());
    }

    #[tokio::test]
    async fn test_insert_replaces_allocated_key() {
        let allocated = Key::from_pairs("p", [("Foo", 5629499534213120_i64)]).unwrap();
        let transport = ScriptedTransport::with_responses([TransportResponse::ok(json!({
            "mutationResults": [{"key": allocated.to_json(), "version": "1"}],
            "indexUpdates": 2
        }))]);

        let mut entities = vec![incomplete_entity()];
        let flags = Committer::new(&transport, URL)
            .apply(MutationOp::Insert, &mut entities)
            .await
            .unwrap();

        assert_eq!(flags, vec![true]);
        assert_eq!(entities[0].key, allocated);
        assert!(entities[0].key.is_complete());

        let request = &transport.requests()[0];
        assert_eq!(request.url, URL);
        assert_eq!(
            request.body["mutations"][0]["insert"]["key"]["path"],
            json!([{"kind": "Foo"}])
        );
    }

    #[tokio::test]
    async fn test_conflict_reported_per_item() {
        let transport = ScriptedTransport::with_responses([TransportResponse::ok(json!({
            "mutationResults": [{"version": "1"}, {"conflictDetected": true}]
        }))]);
        let mut keys = vec![
            Key::from_pairs("p", [("Foo", 1)]).unwrap(),
            Key::from_pairs("p", [("Foo", 2)]).unwrap(),
        ];
        let flags = Committer::new(&transport, URL)
            .apply(MutationOp::Delete, &mut keys)
            .await
            .unwrap();
        assert_eq!(flags, vec![true, false]);
    }

    #[tokio::test]
    async fn test_commit_failure() {
        let transport = ScriptedTransport::with_responses([TransportResponse {
            status: 409,
            body: json!({"error": "too much contention"}),
        }]);
        let err = Committer::new(&transport, URL).commit(&[]).await.unwrap_err();
        assert_eq!(
            err.as_protocol(),
            Some(&ProtocolError::RequestFailed {
                status: 409,
                message: "too much contention".to_string()
            })
        );
    }
}
