//! Object-store abstraction for the conversion pipeline.
//!
//! Three operations are all the pipeline needs: fetch a source object,
//! probe the destination for an existing conversion, and write the
//! converted batch. The write carries a precondition so backends that
//! support create-only semantics turn the existence-check dedupe into
//! a real guarantee.

pub mod keys;
pub mod memory;
pub mod s3;

pub use keys::derive_destination_key;
pub use memory::MemoryStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("storage backend error during {operation} on {bucket}/{key}: {message}")]
    Backend {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn backend(
        operation: &'static str,
        bucket: &str,
        key: &str,
        message: &impl std::fmt::Display,
    ) -> Self {
        Self::Backend {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Precondition for writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePrecondition {
    /// Write only if no object exists at the key.
    DoesNotExist,
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Success,
    /// The precondition did not hold (an object already exists).
    PreconditionFailed,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the raw content of an object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Existence probe. `Ok(false)` means definitively absent (the
    /// backend reported not-found); any other failure is an `Err` and
    /// must never be treated as absent.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;

    /// Write an object, honoring the precondition. A failed
    /// precondition is reported via [`WriteResult`], not an error.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteResult, StoreError>;
}
