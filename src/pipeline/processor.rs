use super::writer::{BatchWriter, WriteError};
use crate::notification::ChangeNotification;
use crate::parser::{CefParser, ParseError, split_lines};
use crate::storage::{ObjectStore, StoreError, WriteResult, derive_destination_key};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to fetch {bucket}/{key}: {source}")]
    FetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("existence probe failed for {bucket}/{key}: {source}")]
    ProbeFailed {
        bucket: String,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("parse failure on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },
    #[error("failed to write {bucket}/{key}: {source}")]
    WriteFailed {
        bucket: String,
        key: String,
        #[source]
        source: WriteError,
    },
}

/// Terminal state of one successfully handled notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The converted batch was written to the destination key.
    Written { key: String, records: usize },
    /// The destination object already exists; duplicate notification.
    DuplicateSkipped { key: String },
    /// The source object was zero-length; nothing to convert.
    EmptySkipped,
}

/// Aggregate result of one invocation batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: usize,
    pub duplicates_skipped: usize,
    pub empties_skipped: usize,
    pub failures: Vec<(ChangeNotification, ProcessError)>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates the conversion of one notification:
/// fetch, dedupe-check, split, parse, write.
///
/// Notifications within a batch are independent, so the batch fans out
/// concurrently (bounded by `max_in_flight`) and a failure on one item
/// never stops its siblings.
pub struct NotificationProcessor {
    store: Arc<dyn ObjectStore>,
    writer: BatchWriter,
    parser: CefParser,
    max_in_flight: usize,
}

impl NotificationProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        destination_bucket: impl Into<String>,
        max_in_flight: usize,
    ) -> Self {
        let writer = BatchWriter::new(store.clone(), destination_bucket);
        Self {
            store,
            writer,
            parser: CefParser::new(),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn destination_bucket(&self) -> &str {
        self.writer.bucket()
    }

    /// Process one notification to its terminal state.
    pub async fn process_one(
        &self,
        notification: &ChangeNotification,
    ) -> Result<Outcome, ProcessError> {
        let content = self
            .store
            .get(&notification.bucket, &notification.key)
            .await
            .map_err(|source| ProcessError::FetchFailed {
                bucket: notification.bucket.clone(),
                key: notification.key.clone(),
                source,
            })?;

        if content.is_empty() {
            return Ok(Outcome::EmptySkipped);
        }

        let destination_key = derive_destination_key(&notification.key);

        // Best-effort replay guard; the create-only write below closes
        // the remaining check-then-write window.
        match self
            .store
            .exists(self.writer.bucket(), &destination_key)
            .await
        {
            Ok(true) => {
                return Ok(Outcome::DuplicateSkipped {
                    key: destination_key,
                });
            }
            Ok(false) => {}
            Err(source) => {
                return Err(ProcessError::ProbeFailed {
                    bucket: self.writer.bucket().to_string(),
                    key: destination_key,
                    source,
                });
            }
        }

        let text = String::from_utf8_lossy(&content);
        let mut records = Vec::new();
        for (index, line) in split_lines(&text).enumerate() {
            if line.is_empty() {
                continue;
            }
            let record = self
                .parser
                .parse(line)
                .map_err(|source| ProcessError::Parse {
                    line: index + 1,
                    source,
                })?;
            records.push(record);
        }

        let count = records.len();
        match self.writer.write(&destination_key, &records).await {
            Ok(WriteResult::Success) => Ok(Outcome::Written {
                key: destination_key,
                records: count,
            }),
            // Lost the create-only race to a concurrent invocation
            Ok(WriteResult::PreconditionFailed) => Ok(Outcome::DuplicateSkipped {
                key: destination_key,
            }),
            Err(source) => Err(ProcessError::WriteFailed {
                bucket: self.writer.bucket().to_string(),
                key: destination_key,
                source,
            }),
        }
    }

    /// Process a batch of notifications with bounded concurrency,
    /// continuing past per-item failures.
    pub async fn process_batch(&self, notifications: &[ChangeNotification]) -> BatchSummary {
        let results: Vec<_> = stream::iter(notifications)
            .map(|notification| async move {
                (notification, self.process_one(notification).await)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (notification, result) in results {
            match result {
                Ok(Outcome::Written { key, records }) => {
                    info!(
                        source_bucket = %notification.bucket,
                        source_key = %notification.key,
                        destination_key = %key,
                        records,
                        "wrote converted batch"
                    );
                    summary.written += 1;
                }
                Ok(Outcome::DuplicateSkipped { key }) => {
                    info!(
                        source_key = %notification.key,
                        destination_key = %key,
                        "destination object already exists, skipping duplicate notification"
                    );
                    summary.duplicates_skipped += 1;
                }
                Ok(Outcome::EmptySkipped) => {
                    info!(
                        source_key = %notification.key,
                        "source object is empty, nothing to convert"
                    );
                    summary.empties_skipped += 1;
                }
                Err(err) => {
                    error!(
                        source_bucket = %notification.bucket,
                        source_key = %notification.key,
                        error = %err,
                        "notification processing failed"
                    );
                    summary.failures.push((notification.clone(), err));
                }
            }
        }
        summary
    }
}
