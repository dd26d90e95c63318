//! Object store contract and implementations.
//!
//! The store is addressed by flat string keys (`{owner_email}/{filename}`)
//! and treated as an external collaborator: each call either completes or
//! fails as a unit with respect to its key. Callers decide what a failure
//! means for their protocol; nothing here retries.

pub mod fs;

use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use fs::FsObjectStore;

/// A stream of object bytes
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Object store failure modes
///
/// `NotFound` and `Unavailable` are kept distinguishable so callers can
/// tell "the key does not exist" from "the store could not be reached".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,

    #[error("object store I/O: {0}")]
    Io(#[from] io::Error),

    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("object stream ended early: wrote {written} of {expected} bytes")]
    Truncated { written: u64, expected: u64 },
}

/// Key-addressed blob store
///
/// `put` must be atomic with respect to `get`: until the payload stream is
/// fully consumed and committed, no reader may observe the object under
/// `key`, and an aborted stream must leave nothing behind.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Idempotently create the backing bucket; called once at startup
    async fn ensure_bucket(&self) -> Result<(), StoreError>;

    /// Write an object, streaming the payload. Returns the byte count
    /// written. If `size_hint` is given and the stream ends at a different
    /// length, the write fails and nothing becomes visible.
    async fn put(
        &self,
        key: &str,
        size_hint: Option<u64>,
        body: ByteStream<'_>,
    ) -> Result<u64, StoreError>;

    /// Open an object for streaming reads
    async fn get(&self, key: &str) -> Result<ByteStream<'static>, StoreError>;

    /// Remove an object. Removing an absent key is `NotFound`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
