//! Integration Tests
//!
//! Cross-crate tests organized by area:
//! - Key codec: wire bytes, key strings and structured form
//! - Pagination: multi-page queries against an in-memory backend
//! - Lookup: deferred-key retry and output slots
//! - Writes: commits, allocated ids and failures
//! - Config: loading `gcdkit.toml`

#[path = "../common/mod.rs"]
mod common;

mod config;
mod key_codec;
mod lookup;
mod pagination;
mod writes;
