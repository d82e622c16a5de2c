//! JSON document store used as the single source of truth for wallets.
//!
//! The [`DocumentStore`] trait is the command contract the ledger consumes: per-key JSON
//! documents with field-level reads, appends and numeric increments, an optimistic
//! watch/exec transaction, and secondary indices for discovery. [`MemoryStore`] keeps
//! everything in-process; [`RedisStore`] talks to a RedisJSON + RediSearch server
//! shared by every instance.

mod errors;
mod memory_store;
mod path;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::Value;
use tokio::time::timeout;

pub use errors::StoreError;
pub use memory_store::MemoryStore;
pub use path::JsonPath;
pub use redis_store::RedisStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Tag
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    /// Only documents whose key starts with this prefix are indexed.
    pub prefix: String,
    pub field: String,
    pub path: String,
    pub field_type: FieldType
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Every word must appear in the text field (case-insensitive).
    Text(String),
    /// The tag field must contain this exact tag (case-insensitive).
    Tag(String)
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub total: usize,
    pub documents: Vec<(String, Value)>
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Append {
        key: String,
        path: String,
        value: Value
    },
    IncrBy {
        key: String,
        path: String,
        delta: Decimal
    }
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Append { key, .. } | WriteOp::IncrBy { key, .. } => key
        }
    }
}

/// Buffered write set applied all-or-nothing by [`DocumentStore::exec`].
#[derive(Debug, Clone, Default)]
pub struct Multi {
    ops: Vec<WriteOp>
}

impl Multi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: &str, path: &str, value: Value) -> &mut Self {
        self.ops.push(WriteOp::Append { key: key.to_string(), path: path.to_string(), value });
        self
    }

    pub fn incr_by(&mut self, key: &str, path: &str, delta: Decimal) -> &mut Self {
        self.ops.push(WriteOp::IncrBy { key: key.to_string(), path: path.to_string(), delta });
        self
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

pub trait DocumentStore: Send + Sync + 'static {
    /// Keys observed by [`DocumentStore::watch`], consumed by the matching `exec`.
    type Watch: Send;

    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with [`StoreError::IndexExists`] when an index with the same name is present.
    fn create_index(&self, index: IndexDefinition) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get(&self, key: &str, path: &str) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Writes the document only if the key is absent. Returns whether it was written.
    fn set_if_absent(&self, key: &str, document: Value) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn watch(&self, keys: &[&str]) -> impl Future<Output = Result<Self::Watch, StoreError>> + Send;

    /// Applies the buffered writes in one transaction.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] without applying anything when any watched key
    /// changed after `watch`.
    fn exec(&self, watch: Self::Watch, multi: Multi) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn search(&self, index: &str, query: &SearchQuery) -> impl Future<Output = Result<SearchResult, StoreError>> + Send;
}

/// Lowercased alphanumeric words of a text field or query.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Bounds a store round-trip, surfacing an expired deadline as [`StoreError::Timeout`].
pub async fn with_timeout<T>(limit: Duration, call: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
    timeout(limit, call).await.map_err(|_| StoreError::Timeout(limit))?
}
