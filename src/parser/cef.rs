use super::extension::parse_extensions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed header: expected at least 5 whitespace-delimited tokens, got {tokens}")]
    MalformedHeader { tokens: usize },
    #[error("malformed CEF fields: expected 8 pipe-delimited segments, got {segments}")]
    MalformedCefFields { segments: usize },
    #[error("malformed CEF version field: {field:?}")]
    MalformedVersion { field: String },
    #[error("malformed extension token (missing '='): {token:?}")]
    MalformedExtensionToken { token: String },
}

/// One parsed CEF audit log line.
///
/// Serializes with the exact field names the downstream consumers
/// expect; `raw` keeps the unmodified source line for auditability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: String,
    pub host: String,
    pub data: HashMap<String, String>,
    pub vendor: String,
    pub product: String,
    pub product_version: String,
    pub event_class_id: String,
    pub event_name: String,
    pub event_severity: String,
    pub raw: String,
    pub version: String,
}

/// Parser for CEF audit log lines:
/// `Timestamp Host CEF:Version|Vendor|Product|ProductVersion|EventClassID|Name|Severity|Extensions`
pub struct CefParser {
    // Stateless today; kept as a struct so callers hold one per pipeline
}

impl Default for CefParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CefParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Parse one non-empty line into an [`AuditRecord`].
    ///
    /// A malformed line never yields a partially populated record; it
    /// yields a typed [`ParseError`] instead.
    pub fn parse(&self, raw: &str) -> Result<AuditRecord, ParseError> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        // 3 timestamp tokens + host + at least one CEF token
        if tokens.len() < 5 {
            return Err(ParseError::MalformedHeader {
                tokens: tokens.len(),
            });
        }

        let timestamp = tokens[..3].join(" ");
        let host = tokens[3].to_string();

        // Rejoin the rest so the pipe-delimited CEF body starts clean
        let remainder = tokens[4..].join(" ");

        // splitn keeps pipes inside the extension blob intact: segment 8
        // is everything from the 8th pipe onward
        let segments: Vec<&str> = remainder.splitn(8, '|').collect();
        if segments.len() < 8 {
            return Err(ParseError::MalformedCefFields {
                segments: segments.len(),
            });
        }

        // CEF:{version}
        let version = match segments[0].split_once(':') {
            Some((_, version)) => version.to_string(),
            None => {
                return Err(ParseError::MalformedVersion {
                    field: segments[0].to_string(),
                });
            }
        };

        let data = parse_extensions(segments[7])?;

        Ok(AuditRecord {
            timestamp,
            host,
            data,
            vendor: segments[1].to_string(),
            product: segments[2].to_string(),
            product_version: segments[3].to_string(),
            event_class_id: segments[4].to_string(),
            event_name: segments[5].to_string(),
            event_severity: segments[6].to_string(),
            raw: raw.to_string(),
            version,
        })
    }
}
