#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Safe within realistic value bounds (counts, sizes)
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. StoreError in storage module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod notification;
pub mod parser;
pub mod pipeline;
pub mod storage;

// Re-export main types for easy access
pub use app::{App, Config};
pub use notification::ChangeNotification;
pub use parser::{AuditRecord, CefParser, ParseError};
pub use pipeline::{BatchSummary, NotificationProcessor, Outcome, ProcessError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
