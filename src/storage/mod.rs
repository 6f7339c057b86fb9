//!
//! riskbase storage module
//! -----------------------
//! Small persistent key-value stores backing the client session. The session only ever
//! keeps a couple of string values (the bearer credential and its type), so the
//! abstraction is string-to-string.
//!
//! Two backends are provided:
//! - [`MemoryKvStore`]: process-local map, used in tests and when persistence is disabled.
//! - [`FileKvStore`]: a JSON object on disk, rewritten atomically on every change.

use anyhow::Result;

pub mod kv;

pub use kv::{FileKvStore, MemoryKvStore};

/// Persistent string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Missing keys and unreadable backing storage both read as `None`.
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
