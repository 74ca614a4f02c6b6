//! Query pagination
//!
//! `runQuery` returns results in batches. Each batch carries a `moreResults`
//! status; [`QueryPaginator`] keeps issuing requests, advancing the start
//! cursor, until the status says the query is exhausted.
//!
//! ## Page transitions
//!
//! ```text
//! Issuing ──► AwaitingResponse ──► Continue ──► Issuing ...
//!                    │
//!                    ├──► Done     (NO_MORE_RESULTS, MORE_RESULTS_AFTER_*)
//!                    └──► Failed   (non-200, unknown status, page cap)
//! ```
//!
//! On `Continue` an explicit limit is reduced by the results already
//! received and any offset is cleared, since the server has already skipped
//! those rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult, ProtocolError};
use crate::transport::Transport;

/// Property name that projects a query onto keys only
pub const KEY_PROPERTY: &str = "__key__";

/// `moreResults` value of a query batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoreResults {
    /// More results may follow the end cursor
    NotFinished,
    /// The limit was reached; more results exist
    MoreResultsAfterLimit,
    /// The end cursor was reached; more results exist
    MoreResultsAfterCursor,
    /// The query is exhausted
    NoMoreResults,
}

impl MoreResults {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            MoreResults::NotFinished => "NOT_FINISHED",
            MoreResults::MoreResultsAfterLimit => "MORE_RESULTS_AFTER_LIMIT",
            MoreResults::MoreResultsAfterCursor => "MORE_RESULTS_AFTER_CURSOR",
            MoreResults::NoMoreResults => "NO_MORE_RESULTS",
        }
    }

    /// True when no further page should be requested
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MoreResults::NotFinished)
    }
}

impl FromStr for MoreResults {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_FINISHED" => Ok(MoreResults::NotFinished),
            "MORE_RESULTS_AFTER_LIMIT" => Ok(MoreResults::MoreResultsAfterLimit),
            "MORE_RESULTS_AFTER_CURSOR" => Ok(MoreResults::MoreResultsAfterCursor),
            "NO_MORE_RESULTS" => Ok(MoreResults::NoMoreResults),
            other => Err(ProtocolError::UnexpectedStatus(other.to_string())),
        }
    }
}

impl fmt::Display for MoreResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of a paginated query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Building the next request
    Issuing,
    /// Request sent, waiting for the batch
    AwaitingResponse,
    /// Batch absorbed; another page is needed
    Continue,
    /// Query exhausted
    Done,
    /// Query aborted with an error
    Failed,
}

/// Partition a request is scoped to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionId {
    /// Project; the URL already names it, so it is usually omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
}

/// `{"name": kind}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindExpression {
    /// Kind name
    pub name: String,
}

/// `{"name": property}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyReference {
    /// Property name
    pub name: String,
}

/// `{"property": {"name": property}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Projected property
    pub property: PropertyReference,
}

/// Query body of a `runQuery` request.
///
/// Only the fields pagination touches are typed. Filters, orders and any
/// other query fields pass through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Kinds to query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kind: Vec<KindExpression>,
    /// Properties to project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projection: Vec<Projection>,
    /// Cursor to start from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    /// Results to skip before the first one returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Maximum results to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Remaining query fields (`filter`, `order`, `distinctOn`, ...)
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Query {
    /// Query over one kind
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: vec![KindExpression { name: kind.into() }],
            ..Self::default()
        }
    }

    /// Project onto keys only
    pub fn keys_only(mut self) -> Self {
        self.projection = vec![Projection {
            property: PropertyReference {
                name: KEY_PROPERTY.to_string(),
            },
        }];
        self
    }

    /// Set the limit
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the start cursor
    pub fn with_start_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.start_cursor = Some(cursor.into());
        self
    }
}

/// Body of a `runQuery` request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    /// Partition to query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
    /// Read options, passed through as given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_options: Option<JsonValue>,
    /// The query
    pub query: Query,
}

impl RunQueryRequest {
    /// Request for a query in the default partition
    pub fn new(query: Query) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Namespace the request names, if any
    pub fn namespace_id(&self) -> Option<&str> {
        self.partition_id
            .as_ref()
            .and_then(|p| p.namespace_id.as_deref())
    }

    /// Fill in `partitionId.namespaceId` when the request does not name one
    pub fn inject_namespace(&mut self, namespace_id: Option<&str>) {
        let Some(ns) = namespace_id else {
            return;
        };
        let partition = self.partition_id.get_or_insert_with(PartitionId::default);
        if partition.namespace_id.is_none() {
            partition.namespace_id = Some(ns.to_string());
        }
    }
}

/// One `batch` of a `runQuery` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultBatch {
    #[serde(default)]
    entity_results: Vec<JsonValue>,
    more_results: String,
    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    batch: QueryResultBatch,
}

/// Everything a finished query produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Raw `entityResults` of every page, in page order
    pub results: Vec<JsonValue>,
    /// End cursor of the last page
    pub end_cursor: Option<String>,
    /// Requests issued
    pub pages: usize,
}

/// Bookkeeping for one paginated query
#[derive(Debug)]
struct Pagination {
    request: RunQueryRequest,
    state: PageState,
    outcome: QueryOutcome,
}

impl Pagination {
    fn new(request: RunQueryRequest) -> Self {
        Self {
            request,
            state: PageState::Issuing,
            outcome: QueryOutcome::default(),
        }
    }

    /// Body of the next request
    fn issue(&mut self) -> ClientResult<JsonValue> {
        debug_assert_eq!(self.state, PageState::Issuing);
        let body = serde_json::to_value(&self.request)
            .map_err(|e| ProtocolError::InvalidArgument(e.to_string()))?;
        self.outcome.pages += 1;
        self.state = PageState::AwaitingResponse;
        Ok(body)
    }

    /// Fold a batch into the outcome and pick the next state
    fn absorb(&mut self, batch: QueryResultBatch) -> Result<PageState, ProtocolError> {
        let status = match batch.more_results.parse::<MoreResults>() {
            Ok(status) => status,
            Err(e) => {
                self.state = PageState::Failed;
                return Err(e);
            }
        };

        if !status.is_terminal() {
            if let Err(e) = self.check_progress(batch.end_cursor.as_deref()) {
                self.state = PageState::Failed;
                return Err(e);
            }
        }

        let received = batch.entity_results.len();
        self.outcome.results.extend(batch.entity_results);
        self.outcome.end_cursor = batch.end_cursor;

        debug!(
            target: "gcdkit::query",
            page = self.outcome.pages,
            received,
            total = self.outcome.results.len(),
            status = %status,
            "Query page received"
        );

        if status.is_terminal() {
            self.state = PageState::Done;
            return Ok(self.state);
        }

        let query = &mut self.request.query;
        query.offset = None;
        query.start_cursor = self.outcome.end_cursor.clone();
        if let Some(limit) = query.limit {
            let remaining = (limit - received as i64).max(0);
            query.limit = Some(remaining);
            if remaining == 0 {
                self.state = PageState::Done;
                return Ok(self.state);
            }
        }

        self.state = PageState::Continue;
        Ok(self.state)
    }

    /// A `NOT_FINISHED` page must hand back a cursor past the one just sent
    fn check_progress(&self, end_cursor: Option<&str>) -> Result<(), ProtocolError> {
        match end_cursor {
            None => Err(ProtocolError::MalformedResponse(
                "runQuery: NOT_FINISHED batch without \"endCursor\"".to_string(),
            )),
            Some(cursor) if self.request.query.start_cursor.as_deref() == Some(cursor) => {
                Err(ProtocolError::MalformedResponse(format!(
                    "runQuery: query made no progress past cursor {}",
                    cursor
                )))
            }
            Some(_) => Ok(()),
        }
    }

    fn fail(&mut self) {
        self.state = PageState::Failed;
    }
}

/// Drives a `runQuery` request through every page
pub struct QueryPaginator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    url: String,
    max_pages: usize,
}

impl<'a, T: Transport + ?Sized> QueryPaginator<'a, T> {
    /// Paginator posting to `url`, giving up after `max_pages` requests
    pub fn new(transport: &'a T, url: impl Into<String>, max_pages: usize) -> Self {
        Self {
            transport,
            url: url.into(),
            max_pages,
        }
    }

    /// Run the query to completion.
    ///
    /// Any failure discards the pages already fetched.
    pub async fn run(&self, request: RunQueryRequest) -> ClientResult<QueryOutcome> {
        let mut pagination = Pagination::new(request);

        loop {
            if pagination.outcome.pages >= self.max_pages {
                pagination.fail();
                warn!(
                    target: "gcdkit::query",
                    pages = pagination.outcome.pages,
                    "Query page limit reached before the query finished"
                );
                return Err(ProtocolError::PageLimitExceeded {
                    pages: pagination.outcome.pages,
                }
                .into());
            }

            let body = pagination.issue()?;
            let response = match self.transport.post(&self.url, &body).await {
                Ok(response) => response,
                Err(e) => {
                    pagination.fail();
                    return Err(e);
                }
            };

            let batch = match parse_batch(response.into_success_body()) {
                Ok(batch) => batch,
                Err(e) => {
                    pagination.fail();
                    return Err(e.into());
                }
            };

            match pagination.absorb(batch) {
                Ok(PageState::Done) => break,
                Ok(_) => pagination.state = PageState::Issuing,
                Err(e) => {
                    warn!(
                        target: "gcdkit::query",
                        page = pagination.outcome.pages,
                        error = %e,
                        "Query aborted"
                    );
                    return Err(ClientError::from(e));
                }
            }
        }

        Ok(pagination.outcome)
    }
}

fn parse_batch(body: Result<JsonValue, ProtocolError>) -> Result<QueryResultBatch, ProtocolError> {
    let body = body?;
    let response: RunQueryResponse = serde_json::from_value(body)
        .map_err(|e| ProtocolError::MalformedResponse(format!("runQuery: {}", e)))?;
    Ok(response.batch)
}
