use async_trait::async_trait;
use bytes::Bytes;
use cef_log_converter::notification::ChangeNotification;
use cef_log_converter::pipeline::{NotificationProcessor, Outcome, ProcessError};
use cef_log_converter::storage::{
    MemoryStore, ObjectStore, StoreError, WritePrecondition, WriteResult,
};
use std::sync::Arc;

const SOURCE_BUCKET: &str = "cef-audit-logs";
const DEST_BUCKET: &str = "json-audit-logs";

const LINE_TUSHAR: &str = "Feb 14 14:53:01 api.pulumi.com CEF:0|Pulumi|Pulumi Service|1.0|User Login|User \"tushar-pulumi-corp\" logged into the Pulumi Console.|0|rt=1676386381000 suser=tushar-pulumi-corp tokenID=";
const LINE_SHAHT: &str = "Feb 14 14:51:47 api.pulumi.com CEF:0|Pulumi|Pulumi Service|1.0|User Login|User \"shaht\" logged into the Pulumi Console.|0|rt=1676386307000 suser=shaht tokenID=";

fn notification(key: &str) -> ChangeNotification {
    ChangeNotification {
        bucket: SOURCE_BUCKET.to_string(),
        key: key.to_string(),
        event_time: "2023-02-14T15:00:00.000Z".parse().ok(),
        event_name: "ObjectCreated:Put".to_string(),
    }
}

fn processor(store: Arc<MemoryStore>) -> NotificationProcessor {
    NotificationProcessor::new(store, DEST_BUCKET, 4)
}

#[tokio::test]
async fn test_multi_line_object_converts_in_source_order() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        SOURCE_BUCKET,
        "2023-02-14_14.ceff",
        format!("{LINE_TUSHAR}\n{LINE_SHAHT}\n"),
    );

    let outcome = processor(store.clone())
        .process_one(&notification("2023-02-14_14.ceff"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Written {
            key: "2023-02-14_14.json".to_string(),
            records: 2,
        }
    );

    let body = store.object(DEST_BUCKET, "2023-02-14_14.json").unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.trim_end().split('\n').collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(first["data"]["suser"], "tushar-pulumi-corp");
    assert_eq!(second["data"]["suser"], "shaht");
    assert_eq!(first["raw"], LINE_TUSHAR);

    assert_eq!(
        store.content_type(DEST_BUCKET, "2023-02-14_14.json").unwrap(),
        "application/json"
    );
}

#[tokio::test]
async fn test_duplicate_notification_is_skipped_with_zero_writes() {
    let store = Arc::new(MemoryStore::new());
    store.insert(SOURCE_BUCKET, "2023-02-14_14.ceff", LINE_TUSHAR);
    let processor = processor(store.clone());

    let first = processor
        .process_one(&notification("2023-02-14_14.ceff"))
        .await
        .unwrap();
    assert!(matches!(first, Outcome::Written { .. }));
    assert_eq!(store.write_count(), 1);

    let original = store.object(DEST_BUCKET, "2023-02-14_14.json").unwrap();

    let second = processor
        .process_one(&notification("2023-02-14_14.ceff"))
        .await
        .unwrap();
    assert_eq!(
        second,
        Outcome::DuplicateSkipped {
            key: "2023-02-14_14.json".to_string(),
        }
    );
    assert_eq!(store.write_count(), 1);
    assert_eq!(
        store.object(DEST_BUCKET, "2023-02-14_14.json").unwrap(),
        original
    );
}

#[tokio::test]
async fn test_empty_object_is_skipped_without_error_or_write() {
    let store = Arc::new(MemoryStore::new());
    store.insert(SOURCE_BUCKET, "empty.ceff", "");

    let outcome = processor(store.clone())
        .process_one(&notification("empty.ceff"))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::EmptySkipped);
    assert_eq!(store.write_count(), 0);
    assert!(store.object(DEST_BUCKET, "empty.json").is_none());
}

#[tokio::test]
async fn test_missing_source_object_is_a_fetch_failure() {
    let store = Arc::new(MemoryStore::new());

    let err = processor(store)
        .process_one(&notification("gone.ceff"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::FetchFailed { .. }));
}

#[tokio::test]
async fn test_malformed_line_fails_only_its_own_notification() {
    let store = Arc::new(MemoryStore::new());
    store.insert(SOURCE_BUCKET, "good.ceff", LINE_TUSHAR);
    store.insert(SOURCE_BUCKET, "bad.ceff", "this is not CEF at all");

    let batch = [notification("good.ceff"), notification("bad.ceff")];
    let summary = processor(store.clone()).process_batch(&batch).await;

    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed(), 1);
    assert!(!summary.is_clean());
    assert!(store.object(DEST_BUCKET, "good.json").is_some());
    assert!(store.object(DEST_BUCKET, "bad.json").is_none());

    let (failed_notification, err) = &summary.failures[0];
    assert_eq!(failed_notification.key, "bad.ceff");
    assert!(matches!(err, ProcessError::Parse { line: 1, .. }));
}

#[tokio::test]
async fn test_batch_counts_mixed_outcomes() {
    let store = Arc::new(MemoryStore::new());
    store.insert(SOURCE_BUCKET, "a.ceff", LINE_TUSHAR);
    store.insert(SOURCE_BUCKET, "b.ceff", LINE_SHAHT);
    store.insert(SOURCE_BUCKET, "empty.ceff", "");
    store.insert(DEST_BUCKET, "b.json", "already converted");

    let batch = [
        notification("a.ceff"),
        notification("b.ceff"),
        notification("empty.ceff"),
    ];
    let summary = processor(store.clone()).process_batch(&batch).await;

    assert_eq!(summary.written, 1);
    assert_eq!(summary.duplicates_skipped, 1);
    assert_eq!(summary.empties_skipped, 1);
    assert!(summary.is_clean());
    assert_eq!(store.object(DEST_BUCKET, "b.json").unwrap(), "already converted");
}

/// Store whose existence probe always fails, for exercising the
/// probe-failed path.
struct BrokenProbeStore {
    inner: MemoryStore,
}

#[async_trait]
impl ObjectStore for BrokenProbeStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.inner.get(bucket, key).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend {
            operation: "HeadObject",
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "access denied".to_string(),
        })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteResult, StoreError> {
        self.inner.put(bucket, key, body, content_type, precondition).await
    }
}

#[tokio::test]
async fn test_probe_failure_is_failed_not_absent() {
    let inner = MemoryStore::new();
    inner.insert(SOURCE_BUCKET, "a.ceff", LINE_TUSHAR);
    let store = Arc::new(BrokenProbeStore { inner });

    let processor = NotificationProcessor::new(store.clone(), DEST_BUCKET, 4);
    let err = processor
        .process_one(&notification("a.ceff"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::ProbeFailed { .. }));
    assert_eq!(store.inner.write_count(), 0);
}

/// Store whose probe always reports absent, simulating the window
/// where two invocations pass the check before either writes.
struct StaleProbeStore {
    inner: MemoryStore,
}

#[async_trait]
impl ObjectStore for StaleProbeStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.inner.get(bucket, key).await
    }

    async fn exists(&self, _bucket: &str, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteResult, StoreError> {
        self.inner.put(bucket, key, body, content_type, precondition).await
    }
}

#[tokio::test]
async fn test_lost_create_only_race_degrades_to_duplicate_skip() {
    let inner = MemoryStore::new();
    inner.insert(SOURCE_BUCKET, "a.ceff", LINE_TUSHAR);
    inner.insert(DEST_BUCKET, "a.json", "winner of the race");
    let store = Arc::new(StaleProbeStore { inner });

    let processor = NotificationProcessor::new(store.clone(), DEST_BUCKET, 4);
    let outcome = processor
        .process_one(&notification("a.ceff"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::DuplicateSkipped {
            key: "a.json".to_string(),
        }
    );
    assert_eq!(
        store.inner.object(DEST_BUCKET, "a.json").unwrap(),
        "winner of the race"
    );
}
