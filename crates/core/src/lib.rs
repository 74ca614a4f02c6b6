//! Core types for gcdkit
//!
//! This crate holds everything that does not touch the network:
//! - varint: 7-bit continuation varint codec
//! - buffer: ByteBuffer (append-only writer) and ByteCursor (scoped reader)
//! - path: PathElement, Identifier and Path with their tagged binary framing
//! - key: Key with its binary, key-string and structured JSON forms
//! - value / entity: property values and entities in the REST encoding
//! - error: codec and key error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod entity;
pub mod error;
pub mod key;
pub mod path;
pub mod value;
pub mod varint;

pub use buffer::{ByteBuffer, ByteCursor};
pub use entity::Entity;
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult, KeyError, ValueError};
pub use key::{IdentifierPolicy, Key, PROJECT_PREFIX};
pub use path::{path_element_from_decoder, path_from_decoder, Identifier, Path, PathElement};
pub use value::{Value, MAX_STRING_LENGTH};
