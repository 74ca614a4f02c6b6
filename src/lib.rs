//! gcdkit - client binding for the Cloud Datastore REST API
//!
//! Two layers:
//! - [`gcdkit_core`]: the key codec (varint, tagged binary framing, URL-safe
//!   key strings) and the entity/value model. No I/O.
//! - [`gcdkit_client`]: query pagination, lookup retry and commits, driven
//!   through a caller-supplied [`Transport`].
//!
//! # Quick Start
//!
//! ```ignore
//! use gcdkit::{ClientConfig, Connector, Key, Query, RunQueryRequest};
//!
//! let key = Key::from_pairs("my-project", [("Foo", 42)])?;
//! println!("{}", key.ks()?);
//!
//! let connector = Connector::new(ClientConfig::new("my-project"), transport)?;
//! let entities = connector
//!     .get_entities(RunQueryRequest::new(Query::kind("Foo")))
//!     .await?;
//! ```

pub use gcdkit_client::{
    commit, config, connector, lookup, query, testing, transport, ClientConfig, ClientError,
    ClientResult, Committer, Connector, LookupOutcome, LookupRetrier, LookupTracking, Method,
    MoreResults, Mutable, Mutation, MutationOp, MutationResult, PageState, PartitionId,
    ProtocolError, Query, QueryOutcome, QueryPaginator, RunQueryRequest, Transport,
    TransportResponse, COMMIT_MODE, DEFAULT_API_ENDPOINT, EMULATOR_HOST_ENV, MAX_LOOKUP_ATTEMPTS,
};
pub use gcdkit_core::{
    buffer, entity, key, path, value, varint, ByteBuffer, ByteCursor, DecodeError, DecodeResult,
    EncodeError, EncodeResult, Entity, Identifier, IdentifierPolicy, Key, KeyError, Path,
    PathElement, Value, ValueError, MAX_STRING_LENGTH, PROJECT_PREFIX,
};

pub use gcdkit_client::error as client_error;
pub use gcdkit_core::error as core_error;
