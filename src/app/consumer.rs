use crate::notification::{self, ChangeNotification};
use crate::pipeline::NotificationProcessor;
use aws_sdk_sqs::types::Message;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

const MAX_MESSAGES_PER_POLL: i32 = 10;
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("failed to receive from queue: {0}")]
    Receive(String),
    #[error("failed to delete message: {0}")]
    Delete(String),
}

/// Long-polling SQS consumer: receives S3 event-notification messages,
/// hands the decoded batches to the [`NotificationProcessor`], and
/// deletes each message once its batch reaches a terminal state.
pub struct SqsConsumer {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    wait_time_secs: i32,
    source_suffix: String,
    processor: Arc<NotificationProcessor>,
}

impl SqsConsumer {
    pub fn new(
        client: aws_sdk_sqs::Client,
        queue_url: impl Into<String>,
        wait_time_secs: i32,
        source_suffix: impl Into<String>,
        processor: Arc<NotificationProcessor>,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            wait_time_secs,
            source_suffix: source_suffix.into(),
            processor,
        }
    }

    /// Receive-process-delete loop. Returns after Ctrl-C; an in-flight
    /// message is always finished before the loop exits.
    pub async fn run(&self) {
        info!(queue = %self.queue_url, "listening for object-created notifications");

        loop {
            let messages = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, stopping consumer");
                    break;
                }
                received = self.receive() => match received {
                    Ok(messages) => messages,
                    Err(err) => {
                        error!(error = %err, "queue receive failed, backing off");
                        tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                        continue;
                    }
                },
            };

            for message in messages {
                self.handle_message(message).await;
            }
        }
    }

    async fn receive(&self) -> Result<Vec<Message>, ConsumerError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(MAX_MESSAGES_PER_POLL)
            .wait_time_seconds(self.wait_time_secs)
            .send()
            .await
            .map_err(|err| ConsumerError::Receive(err.to_string()))?;

        Ok(output.messages.unwrap_or_default())
    }

    async fn handle_message(&self, message: Message) {
        match message.body() {
            Some(body) => match notification::decode_batch(body) {
                Ok(batch) => self.process_batch(batch).await,
                Err(err) => {
                    warn!(error = %err, "dropping undecodable notification message");
                }
            },
            None => warn!("dropping notification message with no body"),
        }

        // Delete after processing either way: per-notification failures
        // are already logged and counted, and redelivering the whole
        // message would only re-skip the converted siblings. Crash
        // redelivery still makes the pipeline at-least-once overall.
        if let Some(receipt_handle) = message.receipt_handle() {
            if let Err(err) = self.delete(receipt_handle).await {
                error!(error = %err, "failed to delete processed message");
            }
        }
    }

    async fn process_batch(&self, batch: Vec<ChangeNotification>) {
        let accepted: Vec<ChangeNotification> = batch
            .into_iter()
            .filter(|notification| {
                // The bucket trigger already filters on suffix; re-check
                // defensively so a misconfigured trigger cannot feed
                // arbitrary objects into the parser.
                if notification.key.ends_with(&self.source_suffix) {
                    true
                } else {
                    info!(
                        key = %notification.key,
                        suffix = %self.source_suffix,
                        "skipping object without the source suffix"
                    );
                    false
                }
            })
            .collect();

        if accepted.is_empty() {
            return;
        }

        let summary = self.processor.process_batch(&accepted).await;
        info!(
            written = summary.written,
            duplicates_skipped = summary.duplicates_skipped,
            empties_skipped = summary.empties_skipped,
            failed = summary.failed(),
            "notification batch processed"
        );
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), ConsumerError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|err| ConsumerError::Delete(err.to_string()))?;
        Ok(())
    }
}
