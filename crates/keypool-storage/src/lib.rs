//! KeyPool Storage - Low-level storage abstraction layer
//!
//! This crate provides the persistence layer for KeyPool, using redb as the
//! embedded database. It exposes byte-level APIs so the record models can live
//! in keypool-core without a circular dependency.
//!
//! # Tables
//!
//! - `api_key_pool:data` - Serialized key records by id
//! - `api_key_pool:created` - Newest-first ordering index
//! - `api_key_pool:secret` - Lookup index from raw key to record ids
//! - `api_key_pool:meta` - Index bookkeeping per record id

pub mod api_key_pool;
pub mod range_utils;
pub mod time_utils;

pub use api_key_pool::{ApiKeyPoolStorage, PoolEntry};
