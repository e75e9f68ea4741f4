//! Document recognition client (image to text).
//!
//! One signed HTTPS POST per call, no retries. Every failure comes back as a
//! `QuillError` value so the caller can fall back to manual entry.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use tracing::{debug, info, warn};

use quill_core::{Credentials, DocumentRecognizer, ImageFormat, QuillError};
use quill_logging::redact_sensitive_data;
use quill_security::{sign_request, Method};

use crate::wire::{recognition_request, RecognitionResponse, RecognizedDocument};

/// Raw HTTP reply as seen by the recognition client.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTP seam so the client can be driven without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: String,
    ) -> Result<HttpReply, QuillError>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, QuillError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuillError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: String,
    ) -> Result<HttpReply, QuillError> {
        let mut request = self.client.post(url).body(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().await.map_err(QuillError::transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(QuillError::transport)?;
        Ok(HttpReply { status, body })
    }
}

/// Client for the document recognition endpoint.
pub struct RecognitionClient<T = ReqwestTransport> {
    credentials: Credentials,
    transport: T,
}

impl RecognitionClient<ReqwestTransport> {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, QuillError> {
        Ok(Self::with_transport(credentials, ReqwestTransport::new(timeout)?))
    }
}

impl<T: HttpTransport> RecognitionClient<T> {
    pub fn with_transport(credentials: Credentials, transport: T) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    /// Recognize the text of one document image.
    pub async fn recognize(&self, image: &[u8], format: ImageFormat) -> Result<String, QuillError> {
        info!(bytes = image.len(), format = format.as_str(), "Starting document recognition");

        let signed = sign_request(&self.credentials, Method::Post)?;
        let url = signed.url("https");
        let body = serde_json::to_string(&recognition_request(
            self.credentials.app_id(),
            image,
            format,
        ))?;
        let headers = [
            ("content-type", "application/json".to_string()),
            ("host", signed.host.clone()),
            ("appid", self.credentials.app_id().to_string()),
        ];

        debug!(url = %redact_sensitive_data(&url), body_len = body.len(), "Posting recognition request");

        let reply = self.transport.post_json(&url, &headers, body).await?;
        let outcome = decode_reply(&reply);
        match &outcome {
            Ok(text) => info!(chars = text.chars().count(), "Document recognized"),
            Err(e) => warn!(kind = %e.kind(), error = %e, "Document recognition failed"),
        }
        outcome
    }
}

#[async_trait]
impl<T: HttpTransport> DocumentRecognizer for RecognitionClient<T> {
    async fn recognize(&self, image: &[u8], format: ImageFormat) -> Result<String, QuillError> {
        RecognitionClient::recognize(self, image, format).await
    }
}

/// Decode the nested base64-in-JSON reply down to the plain text.
pub fn decode_reply(reply: &HttpReply) -> Result<String, QuillError> {
    let parsed = serde_json::from_str::<RecognitionResponse>(&reply.body);

    if reply.status != 200 {
        // Auth failures still carry a header with the remote code.
        return Err(match parsed {
            Ok(response) if response.header.code != 0 => QuillError::RemoteError {
                code: response.header.code,
                message: response.header.message,
            },
            _ => QuillError::TransportError(format!(
                "HTTP {}: {}",
                reply.status,
                reply.body.chars().take(200).collect::<String>()
            )),
        });
    }

    let response = parsed?;
    if response.header.code != 0 {
        return Err(QuillError::RemoteError {
            code: response.header.code,
            message: response.header.message,
        });
    }

    let encoded = response
        .payload
        .and_then(|p| p.result)
        .map(|r| r.text)
        .ok_or_else(|| QuillError::DecodeError("reply has no recognition payload".into()))?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(QuillError::decode)?;
    let inner = String::from_utf8(decoded).map_err(QuillError::decode)?;
    let document: RecognizedDocument = serde_json::from_str(&inner)?;

    document
        .whole_text
        .ok_or_else(|| QuillError::DecodeError("recognized document has no whole_text".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use quill_core::ErrorKind;

    /// Canned transport that records what it was sent.
    struct MockTransport {
        reply: Result<HttpReply, String>,
        seen: Mutex<Vec<(String, Vec<(&'static str, String)>, String)>>,
    }

    impl MockTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&'static str, String)],
            body: String,
        ) -> Result<HttpReply, QuillError> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), headers.to_vec(), body));
            self.reply.clone().map_err(QuillError::TransportError)
        }
    }

    fn client(transport: MockTransport) -> RecognitionClient<MockTransport> {
        let creds = Credentials::from_url(
            "app-1",
            "key",
            "secret",
            "https://api.example.com/v1/private/hh_ocr_recognize_doc",
        )
        .unwrap();
        RecognitionClient::with_transport(creds, transport)
    }

    fn success_body(inner: &str) -> String {
        format!(
            r#"{{"header":{{"code":0,"message":"success","sid":"s"}},"payload":{{"recognizeDocumentRes":{{"text":"{}"}}}}}}"#,
            STANDARD.encode(inner)
        )
    }

    #[tokio::test]
    async fn happy_path_returns_whole_text() {
        let client = client(MockTransport::replying(200, &success_body(r#"{"whole_text":"Hello"}"#)));
        let text = client.recognize(b"\xff\xd8\xffimage", ImageFormat::Jpg).await.unwrap();
        assert_eq!(text, "Hello");

        let seen = client.transport.seen.lock().unwrap();
        let (url, headers, body) = &seen[0];
        assert!(url.starts_with("https://api.example.com/v1/private/hh_ocr_recognize_doc?authorization="));
        assert!(url.contains("&date=") && url.ends_with("&host=api.example.com"));
        assert!(headers.contains(&("appid", "app-1".to_string())));
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["payload"]["image"]["encoding"], "jpg");
        assert_eq!(body["header"]["app_id"], "app-1");
    }

    #[tokio::test]
    async fn remote_error_is_surfaced() {
        let body = r#"{"header":{"code":40303,"message":"invalid signature","sid":"s"}}"#;
        let client = client(MockTransport::replying(200, body));
        match client.recognize(b"img", ImageFormat::Png).await {
            Err(QuillError::RemoteError { code, message }) => {
                assert_eq!(code, 40303);
                assert_eq!(message, "invalid signature");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_a_value() {
        let client = client(MockTransport::failing("connection refused"));
        let err = client.recognize(b"img", ImageFormat::Jpg).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn non_200_with_header_is_remote_error() {
        let reply = HttpReply {
            status: 401,
            body: r#"{"header":{"code":11200,"message":"licence not enough"}}"#.into(),
        };
        assert_eq!(decode_reply(&reply).unwrap_err().kind(), ErrorKind::Remote);

        let reply = HttpReply {
            status: 502,
            body: "<html>bad gateway</html>".into(),
        };
        assert_eq!(decode_reply(&reply).unwrap_err().kind(), ErrorKind::Transport);
    }

    #[test]
    fn every_decode_stage_fails_softly() {
        let cases = [
            "not json".to_string(),
            r#"{"header":{"code":0}}"#.to_string(),
            r#"{"header":{"code":0},"payload":{"recognizeDocumentRes":{"text":"%%%not base64"}}}"#.to_string(),
            success_body("not inner json"),
            success_body(r#"{"other":"field"}"#),
        ];
        for body in cases {
            let reply = HttpReply { status: 200, body };
            let err = decode_reply(&reply).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "{err}");
        }
    }
}
