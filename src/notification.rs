//! Object-change notifications and their wire decoding.
//!
//! S3 publishes object-created events as a JSON document with a
//! `Records` array; the queue delivers one document per message. Keys
//! inside the document are URL-encoded and must be decoded before they
//! are used against the API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("invalid notification document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// One unit of work: an object created in the source bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub bucket: String,
    pub key: String,
    pub event_time: Option<DateTime<Utc>>,
    pub event_name: String,
}

#[derive(Debug, Deserialize)]
struct S3EventDocument {
    #[serde(rename = "Records", default)]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    #[serde(rename = "eventTime", default)]
    event_time: Option<DateTime<Utc>>,
    #[serde(rename = "eventName", default)]
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Decode one queue message body into a batch of notifications.
///
/// The `s3:TestEvent` document S3 publishes when notification wiring
/// is created decodes to an empty batch.
pub fn decode_batch(body: &str) -> Result<Vec<ChangeNotification>, NotificationError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if value.get("Event").and_then(|event| event.as_str()) == Some("s3:TestEvent") {
        return Ok(Vec::new());
    }

    let document: S3EventDocument = serde_json::from_value(value)?;
    Ok(document
        .records
        .into_iter()
        .map(|record| ChangeNotification {
            bucket: record.s3.bucket.name,
            key: decode_object_key(&record.s3.object.key),
            event_time: record.event_time,
            event_name: record.event_name,
        })
        .collect())
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Undo the URL encoding S3 applies to object keys in event documents
/// (`+` for space, `%XX` escapes). Malformed escapes pass through
/// verbatim rather than failing the whole notification.
fn decode_object_key(encoded: &str) -> String {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_value);
                let lo = bytes.get(i + 2).copied().and_then(hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    decoded.push(hi * 16 + lo);
                    i += 3;
                } else {
                    decoded.push(b'%');
                    i += 1;
                }
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
