//! Shared test utilities for the integration suite.
//!
//! [`FakeDatastore`] is an in-memory backend speaking the three REST methods
//! the client uses. It pages query results, defers lookup keys beyond a
//! per-call batch size and allocates ids for incomplete keys on insert.

#![allow(dead_code)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use gcdkit::{ClientConfig, ClientResult, Connector, Entity, Key, Transport, TransportResponse};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};

pub const PROJECT: &str = "test-project";

// ============================================================================
// Builders
// ============================================================================

/// Complete key `(kind, id)` in the test project
pub fn key(kind: &str, id: i64) -> Key {
    Key::from_pairs(PROJECT, [(kind, id)]).unwrap()
}

/// Entity with a single integer property `n`
pub fn entity(kind: &str, id: i64) -> Entity {
    let mut entity = Entity::new(key(kind, id));
    entity.set_property("n", id);
    entity
}

/// Connector over a fake backend, pointed at a local endpoint
pub fn connector(store: FakeDatastore) -> Connector<FakeDatastore> {
    let config = ClientConfig::new(PROJECT).with_endpoint("http://localhost:8081");
    Connector::new(config, store).unwrap()
}

// ============================================================================
// FakeDatastore
// ============================================================================

#[derive(Default)]
struct State {
    /// Entity JSON by key string
    entities: BTreeMap<String, JsonValue>,
    next_id: i64,
}

/// In-memory `runQuery` / `lookup` / `commit` backend
pub struct FakeDatastore {
    state: Mutex<State>,
    requests: Mutex<Vec<(String, JsonValue)>>,
    page_size: usize,
    lookup_batch: usize,
}

impl FakeDatastore {
    /// Backend returning `page_size` query results and resolving
    /// `lookup_batch` keys per call
    pub fn new(page_size: usize, lookup_batch: usize) -> Self {
        Self {
            state: Mutex::new(State {
                entities: BTreeMap::new(),
                next_id: 1000,
            }),
            requests: Mutex::new(Vec::new()),
            page_size,
            lookup_batch,
        }
    }

    /// Store entities directly
    pub fn with_entities(self, entities: impl IntoIterator<Item = Entity>) -> Self {
        {
            let mut state = self.state.lock();
            for e in entities {
                state
                    .entities
                    .insert(e.key.ks().unwrap().to_string(), e.to_json());
            }
        }
        self
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Requests received for one method (`runQuery`, `lookup`, `commit`)
    pub fn requests_for(&self, method: &str) -> Vec<JsonValue> {
        self.requests
            .lock()
            .iter()
            .filter(|(url, _)| url.ends_with(&format!(":{}", method)))
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn run_query(&self, body: &JsonValue) -> TransportResponse {
        let query = &body["query"];
        let kind = query["kind"][0]["name"].as_str().unwrap_or_default();
        let keys_only = query["projection"][0]["property"]["name"] == json!("__key__");
        let start: usize = query["startCursor"]
            .as_str()
            .map(|c| c.parse().unwrap())
            .unwrap_or(0);
        let offset = query["offset"].as_u64().unwrap_or(0) as usize;
        let limit = query["limit"].as_u64().map(|l| l as usize);

        let state = self.state.lock();
        let matching: Vec<&JsonValue> = state
            .entities
            .values()
            .filter(|e| {
                let path = e["key"]["path"].as_array().unwrap();
                path.last().unwrap()["kind"] == json!(kind)
            })
            .collect();

        let begin = (start + offset).min(matching.len());
        let mut take = self.page_size.min(matching.len() - begin);
        if let Some(limit) = limit {
            take = take.min(limit);
        }
        let end = begin + take;

        let results: Vec<JsonValue> = matching[begin..end]
            .iter()
            .map(|e| {
                if keys_only {
                    json!({"entity": {"key": e["key"].clone()}})
                } else {
                    json!({"entity": (*e).clone()})
                }
            })
            .collect();

        let more_results = if end >= matching.len() {
            "NO_MORE_RESULTS"
        } else if limit == Some(take) {
            "MORE_RESULTS_AFTER_LIMIT"
        } else {
            "NOT_FINISHED"
        };

        TransportResponse::ok(json!({
            "batch": {
                "entityResults": results,
                "moreResults": more_results,
                "endCursor": end.to_string()
            }
        }))
    }

    fn lookup(&self, body: &JsonValue) -> TransportResponse {
        let keys = body["keys"].as_array().cloned().unwrap_or_default();
        let state = self.state.lock();

        let mut found = Vec::new();
        let mut missing = Vec::new();
        let mut deferred = Vec::new();
        for (i, key_json) in keys.into_iter().enumerate() {
            if i >= self.lookup_batch {
                deferred.push(key_json);
                continue;
            }
            let ks = Key::from_json(&key_json).unwrap().ks().unwrap().to_string();
            match state.entities.get(&ks) {
                Some(e) => found.push(json!({"entity": e, "version": "1"})),
                None => missing.push(json!({"entity": {"key": key_json}, "version": "1"})),
            }
        }

        TransportResponse::ok(json!({"found": found, "missing": missing, "deferred": deferred}))
    }

    fn commit(&self, body: &JsonValue) -> TransportResponse {
        let mut state = self.state.lock();
        let mut results = Vec::new();

        for mutation in body["mutations"].as_array().cloned().unwrap_or_default() {
            let (op, payload) = mutation.as_object().unwrap().iter().next().unwrap();
            let mut payload = payload.clone();
            let key_json = if op == "delete" {
                payload.clone()
            } else {
                payload["key"].clone()
            };
            let key = Key::from_json(&key_json).unwrap();

            let mut result = json!({"version": "1"});
            let key = if key.is_complete() {
                key
            } else {
                state.next_id += 1;
                let mut allocated = key_json.clone();
                let path = allocated["path"].as_array_mut().unwrap();
                let last = path.len() - 1;
                path[last]["id"] = json!(state.next_id.to_string());
                payload["key"] = allocated.clone();
                result["key"] = allocated.clone();
                Key::from_json(&allocated).unwrap()
            };
            let ks = key.ks().unwrap().to_string();

            match op.as_str() {
                "insert" if state.entities.contains_key(&ks) => {
                    return TransportResponse {
                        status: 400,
                        body: json!({"error": {"code": 400, "message": "entity already exists", "status": "ALREADY_EXISTS"}}),
                    };
                }
                "update" if !state.entities.contains_key(&ks) => {
                    return TransportResponse {
                        status: 404,
                        body: json!({"error": {"code": 404, "message": "no entity to update", "status": "NOT_FOUND"}}),
                    };
                }
                "insert" | "upsert" | "update" => {
                    state.entities.insert(ks, payload);
                }
                "delete" => {
                    state.entities.remove(&ks);
                }
                other => panic!("unexpected mutation {}", other),
            }
            results.push(result);
        }

        TransportResponse::ok(json!({"mutationResults": results, "indexUpdates": 0}))
    }
}

#[async_trait]
impl Transport for FakeDatastore {
    async fn post(&self, url: &str, body: &JsonValue) -> ClientResult<TransportResponse> {
        self.requests.lock().push((url.to_string(), body.clone()));
        let method = url.rsplit(':').next().unwrap_or_default();
        Ok(match method {
            "runQuery" => self.run_query(body),
            "lookup" => self.lookup(body),
            "commit" => self.commit(body),
            other => TransportResponse {
                status: 404,
                body: json!({"error": format!("unknown method {}", other)}),
            },
        })
    }
}
