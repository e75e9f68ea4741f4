//! Facade over the recognition and chat clients.

use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use quill_core::{
    CorrectionResult, DocumentRecognizer, EssayChecker, ImageFormat, QuillError, RecordSink,
    SourceType,
};

/// Entry point used by front ends: recognize images, check essays, and
/// optionally record each check.
#[derive(Clone)]
pub struct SparkService {
    recognizer: Arc<dyn DocumentRecognizer>,
    checker: Arc<dyn EssayChecker>,
}

impl SparkService {
    pub fn new(recognizer: Arc<dyn DocumentRecognizer>, checker: Arc<dyn EssayChecker>) -> Self {
        Self {
            recognizer,
            checker,
        }
    }

    /// Recognize the text of an image. The format is sniffed from the bytes
    /// and falls back to `hint`.
    pub async fn recognize_document(
        &self,
        image: &[u8],
        hint: ImageFormat,
    ) -> Result<String, QuillError> {
        let format = ImageFormat::sniff(image).unwrap_or(hint);
        self.recognizer.recognize(image, format).await
    }

    pub async fn check_essay(&self, essay: &str) -> CorrectionResult {
        self.checker.check_essay(essay).await
    }

    /// Check an essay and append the outcome to `sink`.
    ///
    /// A failed append is logged; the correction is still returned.
    pub async fn check_and_record(
        &self,
        essay: &str,
        source_type: SourceType,
        sink: &dyn RecordSink,
    ) -> CorrectionResult {
        let result = self.check_essay(essay).await;
        match sink.append(essay, &result, source_type, Local::now()).await {
            Ok(id) => info!(id, %source_type, "Recorded essay check"),
            Err(e) => warn!(error = %e, "Failed to record essay check"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::DateTime;

    struct FixedRecognizer {
        seen: Mutex<Vec<ImageFormat>>,
    }

    #[async_trait]
    impl DocumentRecognizer for FixedRecognizer {
        async fn recognize(&self, _image: &[u8], format: ImageFormat) -> Result<String, QuillError> {
            self.seen.lock().unwrap().push(format);
            Ok("recognized".into())
        }
    }

    struct EchoChecker;

    #[async_trait]
    impl EssayChecker for EchoChecker {
        async fn check_essay(&self, essay: &str) -> CorrectionResult {
            CorrectionResult {
                corrected_text: essay.to_uppercase(),
                ..CorrectionResult::safe_default()
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        rows: Mutex<Vec<(String, SourceType)>>,
        broken: bool,
    }

    #[async_trait]
    impl RecordSink for MemorySink {
        async fn append(
            &self,
            content: &str,
            _result: &CorrectionResult,
            source_type: SourceType,
            _timestamp: DateTime<Local>,
        ) -> Result<u64, QuillError> {
            if self.broken {
                return Err(QuillError::StorageError("disk full".into()));
            }
            let mut rows = self.rows.lock().unwrap();
            rows.push((content.to_string(), source_type));
            Ok(rows.len() as u64)
        }
    }

    fn service() -> (SparkService, Arc<FixedRecognizer>) {
        let recognizer = Arc::new(FixedRecognizer {
            seen: Mutex::new(Vec::new()),
        });
        (SparkService::new(recognizer.clone(), Arc::new(EchoChecker)), recognizer)
    }

    #[tokio::test]
    async fn sniffed_format_overrides_hint() {
        let (service, recognizer) = service();
        service
            .recognize_document(b"\x89PNG\r\n\x1a\nbody", ImageFormat::Jpg)
            .await
            .unwrap();
        service.recognize_document(b"unknown", ImageFormat::Png).await.unwrap();
        assert_eq!(
            *recognizer.seen.lock().unwrap(),
            vec![ImageFormat::Png, ImageFormat::Png]
        );
    }

    #[tokio::test]
    async fn records_each_check() {
        let (service, _) = service();
        let sink = MemorySink::default();
        let result = service.check_and_record("my essay", SourceType::Word, &sink).await;
        assert_eq!(result.corrected_text, "MY ESSAY");
        assert_eq!(
            *sink.rows.lock().unwrap(),
            vec![("my essay".to_string(), SourceType::Word)]
        );
    }

    #[tokio::test]
    async fn record_failure_does_not_lose_result() {
        let (service, _) = service();
        let sink = MemorySink {
            broken: true,
            ..Default::default()
        };
        let result = service.check_and_record("text", SourceType::Text, &sink).await;
        assert_eq!(result.corrected_text, "TEXT");
    }
}
