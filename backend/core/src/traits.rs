use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::QuillError;
use crate::types::{CorrectionResult, ImageFormat, SourceType};

/// Turns an image of a document into plain text.
///
/// Failures are returned as values so the caller can fall back to manual
/// text entry; implementations never panic on malformed remote output.
#[async_trait]
pub trait DocumentRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8], format: ImageFormat) -> Result<String, QuillError>;
}

/// Produces a correction for an essay.
///
/// Infallible by contract: transport and remote failures degrade to
/// [`CorrectionResult::safe_default`].
#[async_trait]
pub trait EssayChecker: Send + Sync {
    async fn check_essay(&self, text: &str) -> CorrectionResult;
}

/// Append-only destination for completed checks.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one record and return its id.
    async fn append(
        &self,
        content: &str,
        result: &CorrectionResult,
        source_type: SourceType,
        timestamp: DateTime<Local>,
    ) -> Result<u64, QuillError>;
}
