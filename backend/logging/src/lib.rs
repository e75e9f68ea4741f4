//! Structured logging for quill.
//!
//! Console plus rolling NDJSON file output, and redaction of credentials
//! before they reach either sink.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LOG_FILE_PREFIX};
pub use redact::redact_sensitive_data;
