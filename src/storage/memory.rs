use super::{ObjectStore, StoreError, WritePrecondition, WriteResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
}

/// In-memory [`ObjectStore`] used by tests. Honors the same write
/// preconditions as the S3 backend so both dedupe paths are
/// exercisable without a real bucket.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, bypassing preconditions and write counting.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    body: body.into(),
                    content_type: "application/octet-stream".to_string(),
                },
            );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|stored| stored.body.clone())
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|stored| stored.content_type.clone())
    }

    /// Number of successful writes through [`ObjectStore::put`].
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.object(bucket, key).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.object(bucket, key).is_some())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteResult, StoreError> {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = (bucket.to_string(), key.to_string());

        if precondition == WritePrecondition::DoesNotExist && objects.contains_key(&id) {
            return Ok(WriteResult::PreconditionFailed);
        }

        objects.insert(
            id,
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(WriteResult::Success)
    }
}
