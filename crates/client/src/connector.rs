//! Connector: the client entry point
//!
//! A [`Connector`] owns the configuration and a [`Transport`] and exposes
//! the read and write verbs of the REST API. Queries go through
//! [`QueryPaginator`], key lookups through [`LookupRetrier`] and writes
//! through [`Committer`].
//!
//! # Example
//!
//! ```ignore
//! use gcdkit_client::{ClientConfig, Connector};
//!
//! let connector = Connector::new(ClientConfig::new("my-project"), transport)?;
//! let (entities, cursor) = connector
//!     .get_entities_by_kind("Foo", None, Some(100), None)
//!     .await?;
//! ```

use gcdkit_core::{Entity, Key};
use serde_json::Value as JsonValue;

use crate::commit::{Committer, Mutable, Mutation, MutationOp, MutationResult};
use crate::config::{ClientConfig, Method};
use crate::error::{ClientResult, ProtocolError};
use crate::lookup::{LookupRetrier, LookupTracking};
use crate::query::{Query, QueryOutcome, QueryPaginator, RunQueryRequest};
use crate::transport::Transport;

/// Client bound to one project
pub struct Connector<T: Transport> {
    config: ClientConfig,
    transport: T,
    run_query_url: String,
    lookup_url: String,
    commit_url: String,
}

impl<T: Transport> Connector<T> {
    /// Validate `config` and resolve the method URLs once
    pub fn new(config: ClientConfig, transport: T) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            run_query_url: config.method_url(Method::RunQuery),
            lookup_url: config.method_url(Method::Lookup),
            commit_url: config.method_url(Method::Commit),
            config,
            transport,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// URL a method is posted to
    pub fn url(&self, method: Method) -> &str {
        match method {
            Method::RunQuery => &self.run_query_url,
            Method::Lookup => &self.lookup_url,
            Method::Commit => &self.commit_url,
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    async fn paginate(&self, mut request: RunQueryRequest) -> ClientResult<QueryOutcome> {
        request.inject_namespace(self.config.namespace_id.as_deref());
        QueryPaginator::new(
            &self.transport,
            self.run_query_url.as_str(),
            self.config.max_query_pages,
        )
        .run(request)
        .await
    }

    /// Raw `entityResults` of every page
    pub async fn run_query(&self, request: RunQueryRequest) -> ClientResult<Vec<JsonValue>> {
        Ok(self.paginate(request).await?.results)
    }

    /// Raw results plus the end cursor of the last page
    pub async fn run_query_with_cursor(
        &self,
        request: RunQueryRequest,
    ) -> ClientResult<(Vec<JsonValue>, Option<String>)> {
        let outcome = self.paginate(request).await?;
        Ok((outcome.results, outcome.end_cursor))
    }

    /// Entities matched by a query
    pub async fn get_entities(&self, request: RunQueryRequest) -> ClientResult<Vec<Entity>> {
        let results = self.run_query(request).await?;
        results.iter().map(entity_of).collect()
    }

    /// First entity matched by a query
    pub async fn get_entity(&self, mut request: RunQueryRequest) -> ClientResult<Option<Entity>> {
        request.query.limit = Some(1);
        Ok(self.get_entities(request).await?.into_iter().next())
    }

    /// Keys matched by a query
    pub async fn get_keys(&self, mut request: RunQueryRequest) -> ClientResult<Vec<Key>> {
        request.query = request.query.keys_only();
        let results = self.run_query(request).await?;
        results.iter().map(key_of).collect()
    }

    /// First key matched by a query
    pub async fn get_key(&self, mut request: RunQueryRequest) -> ClientResult<Option<Key>> {
        request.query.limit = Some(1);
        Ok(self.get_keys(request).await?.into_iter().next())
    }

    /// Entities of one kind, with the cursor to resume from
    pub async fn get_entities_by_kind(
        &self,
        kind: &str,
        offset: Option<i64>,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> ClientResult<(Vec<Entity>, Option<String>)> {
        let mut query = Query::kind(kind);
        query.offset = offset.filter(|&o| o > 0);
        query.limit = limit;
        query.start_cursor = cursor.filter(|c| !c.is_empty()).map(str::to_owned);

        let (results, end_cursor) = self
            .run_query_with_cursor(RunQueryRequest::new(query))
            .await?;
        let entities = results.iter().map(entity_of).collect::<ClientResult<_>>()?;
        Ok((entities, end_cursor))
    }

    // ---------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------

    /// Entities for `keys`, in server order.
    ///
    /// `missing` and `deferred` are optional output slots and must be empty.
    /// With `deferred` set, deferred keys are appended to it after one
    /// request instead of being retried. A failure in that mode after some
    /// entities were resolved is [`ClientError::PartialLookup`](crate::ClientError::PartialLookup).
    pub async fn get_entities_by_keys(
        &self,
        keys: &[Key],
        missing: Option<&mut Vec<Entity>>,
        deferred: Option<&mut Vec<Key>>,
        eventual: bool,
    ) -> ClientResult<Vec<Entity>> {
        if missing.as_ref().is_some_and(|m| !m.is_empty()) {
            return Err(ProtocolError::InvalidArgument(
                "missing must be None or an empty list".to_string(),
            )
            .into());
        }
        if deferred.as_ref().is_some_and(|d| !d.is_empty()) {
            return Err(ProtocolError::InvalidArgument(
                "deferred must be None or an empty list".to_string(),
            )
            .into());
        }

        let tracking = LookupTracking {
            missing: missing.is_some(),
            deferred: deferred.is_some(),
        };
        let outcome = LookupRetrier::new(&self.transport, self.lookup_url.as_str())
            .eventual(eventual)
            .tracking(tracking)
            .run(keys.to_vec())
            .await?;

        if let Some(missing) = missing {
            missing.extend(outcome.missing);
        }
        if let Some(deferred) = deferred {
            deferred.extend(outcome.deferred);
        }
        Ok(outcome.found)
    }

    /// Entity for one key
    pub async fn get_entity_by_key(
        &self,
        key: &Key,
        missing: Option<&mut Vec<Entity>>,
        deferred: Option<&mut Vec<Key>>,
        eventual: bool,
    ) -> ClientResult<Option<Entity>> {
        let found = self
            .get_entities_by_keys(std::slice::from_ref(key), missing, deferred, eventual)
            .await?;
        Ok(found.into_iter().next())
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Commit raw mutations
    pub async fn commit(&self, mutations: &[Mutation]) -> ClientResult<Vec<MutationResult>> {
        Committer::new(&self.transport, self.commit_url.as_str())
            .commit(mutations)
            .await
    }

    async fn apply<M: Mutable>(&self, op: MutationOp, items: &mut [M]) -> ClientResult<Vec<bool>> {
        Committer::new(&self.transport, self.commit_url.as_str())
            .apply(op, items)
            .await
    }

    async fn apply_one<M: Mutable>(&self, op: MutationOp, item: &mut M) -> ClientResult<bool> {
        let flags = self.apply(op, std::slice::from_mut(item)).await?;
        flags.first().copied().ok_or_else(|| {
            ProtocolError::MalformedResponse("commit: no mutation result returned".to_string())
                .into()
        })
    }

    /// Insert entities; allocated keys are written back
    pub async fn insert_entities(&self, entities: &mut [Entity]) -> ClientResult<Vec<bool>> {
        self.apply(MutationOp::Insert, entities).await
    }

    /// Insert one entity
    pub async fn insert_entity(&self, entity: &mut Entity) -> ClientResult<bool> {
        self.apply_one(MutationOp::Insert, entity).await
    }

    /// Insert or replace entities
    pub async fn upsert_entities(&self, entities: &mut [Entity]) -> ClientResult<Vec<bool>> {
        self.apply(MutationOp::Upsert, entities).await
    }

    /// Insert or replace one entity
    pub async fn upsert_entity(&self, entity: &mut Entity) -> ClientResult<bool> {
        self.apply_one(MutationOp::Upsert, entity).await
    }

    /// Replace existing entities
    pub async fn update_entities(&self, entities: &mut [Entity]) -> ClientResult<Vec<bool>> {
        self.apply(MutationOp::Update, entities).await
    }

    /// Replace one existing entity
    pub async fn update_entity(&self, entity: &mut Entity) -> ClientResult<bool> {
        self.apply_one(MutationOp::Update, entity).await
    }

    /// Delete by key
    pub async fn delete_keys(&self, keys: &[Key]) -> ClientResult<Vec<bool>> {
        let mut keys = keys.to_vec();
        self.apply(MutationOp::Delete, &mut keys).await
    }

    /// Delete one key
    pub async fn delete_key(&self, key: &Key) -> ClientResult<bool> {
        let mut key = key.clone();
        self.apply_one(MutationOp::Delete, &mut key).await
    }
}

fn entity_of(result: &JsonValue) -> ClientResult<Entity> {
    let entity = result.get("entity").ok_or_else(|| {
        ProtocolError::MalformedResponse("query result without \"entity\"".to_string())
    })?;
    Ok(Entity::from_json(entity)?)
}

fn key_of(result: &JsonValue) -> ClientResult<Key> {
    let key = result
        .get("entity")
        .and_then(|e| e.get("key"))
        .ok_or_else(|| {
            ProtocolError::MalformedResponse("query result without \"entity.key\"".to_string())
        })?;
    Ok(Key::from_json(key)?)
}
