pub mod processor;
pub mod writer;

pub use processor::{BatchSummary, NotificationProcessor, Outcome, ProcessError};
pub use writer::{BatchWriter, WriteError, serialize_ndjson};
