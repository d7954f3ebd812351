pub mod cef;
pub mod extension;
pub mod lines;

pub use cef::{AuditRecord, CefParser, ParseError};
pub use extension::parse_extensions;
pub use lines::split_lines;
