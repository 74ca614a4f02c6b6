//! REST client core for gcdkit
//!
//! - transport: the POST seam every request goes through
//! - config: project, namespace and endpoint settings (`gcdkit.toml`)
//! - query: `runQuery` pagination driven by `moreResults`
//! - lookup: `lookup` with bounded deferred-key retry
//! - commit: non-transactional mutations
//! - connector: the facade tying them together
//! - testing: scripted in-memory transport

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commit;
pub mod config;
pub mod connector;
pub mod error;
pub mod lookup;
pub mod query;
pub mod testing;
pub mod transport;

pub use commit::{Committer, Mutable, Mutation, MutationOp, MutationResult, COMMIT_MODE};
pub use config::{ClientConfig, Method, DEFAULT_API_ENDPOINT, EMULATOR_HOST_ENV};
pub use connector::Connector;
pub use error::{ClientError, ClientResult, ProtocolError};
pub use lookup::{LookupOutcome, LookupRetrier, LookupTracking, MAX_LOOKUP_ATTEMPTS};
pub use query::{
    MoreResults, PageState, PartitionId, Query, QueryOutcome, QueryPaginator, RunQueryRequest,
};
pub use transport::{Transport, TransportResponse};
