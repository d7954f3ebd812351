use crate::parser::AuditRecord;
use crate::storage::{ObjectStore, StoreError, WritePrecondition, WriteResult};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

const CONTENT_TYPE_JSON: &str = "application/json";
const ESTIMATED_RECORD_SIZE: usize = 512; // bytes, for buffer pre-sizing

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("NDJSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("destination write failed: {0}")]
    Store(#[from] StoreError),
}

/// Serialize records to newline-delimited JSON, one record per line.
pub fn serialize_ndjson(records: &[AuditRecord]) -> Result<Bytes, WriteError> {
    let mut buffer = Vec::with_capacity(records.len() * ESTIMATED_RECORD_SIZE);

    for record in records {
        serde_json::to_writer(&mut buffer, record)?;
        buffer.push(b'\n');
    }

    Ok(Bytes::from(buffer))
}

/// Writes converted batches to the destination bucket.
///
/// Writes are create-only: the store-level precondition means a lost
/// race against a concurrent conversion of the same source object
/// surfaces as [`WriteResult::PreconditionFailed`], never as a second
/// copy of the object.
pub struct BatchWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn write(
        &self,
        key: &str,
        records: &[AuditRecord],
    ) -> Result<WriteResult, WriteError> {
        let body = serialize_ndjson(records)?;
        let result = self
            .store
            .put(
                &self.bucket,
                key,
                body,
                CONTENT_TYPE_JSON,
                WritePrecondition::DoesNotExist,
            )
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CefParser;
    use crate::storage::MemoryStore;

    fn sample_records(count: usize) -> Vec<AuditRecord> {
        let parser = CefParser::new();
        (0..count)
            .map(|i| {
                parser
                    .parse(&format!(
                        "Feb 14 14:53:0{i} host CEF:0|Pulumi|Pulumi Service|1.0|User Login|login|0|suser=user{i} tokenID="
                    ))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_serialize_ndjson_one_line_per_record() {
        let records = sample_records(3);
        let body = serialize_ndjson(&records).unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        let lines: Vec<&str> = text.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 3);

        for (i, line) in lines.iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["data"]["suser"], format!("user{i}"));
            assert_eq!(value["productVersion"], "1.0");
        }
    }

    #[test]
    fn test_serialize_ndjson_empty_batch_is_empty_document() {
        let body = serialize_ndjson(&[]).unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_write_sets_json_content_type() {
        let store = Arc::new(MemoryStore::new());
        let writer = BatchWriter::new(store.clone(), "json-audit-logs");

        let result = writer.write("out.json", &sample_records(1)).await.unwrap();
        assert_eq!(result, WriteResult::Success);
        assert_eq!(
            store.content_type("json-audit-logs", "out.json").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_write_is_create_only() {
        let store = Arc::new(MemoryStore::new());
        store.insert("json-audit-logs", "out.json", "existing");
        let writer = BatchWriter::new(store.clone(), "json-audit-logs");

        let result = writer.write("out.json", &sample_records(1)).await.unwrap();
        assert_eq!(result, WriteResult::PreconditionFailed);
        assert_eq!(
            store.object("json-audit-logs", "out.json").unwrap(),
            "existing"
        );
    }
}
