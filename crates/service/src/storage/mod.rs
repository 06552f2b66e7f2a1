//! Storage abstractions for the service layer
//!
//! A [`kv::KvBackend`] is the text key-value medium (file-backed JSON map or
//! in-memory map); [`record_store::RecordStore`] layers named, JSON-encoded
//! record collections on top of it.

pub mod kv;
pub mod json_map_store;
pub mod record_store;

pub use kv::{KvBackend, MemoryKv};
pub use json_map_store::JsonMapStore;
pub use record_store::{Collection, RecordStore};
