//! Request signing for the platform's HMAC-SHA256 scheme.
//!
//! The remote verifier rebuilds the signing string from the `host` and `date`
//! it receives plus the request line, so the date used here must be the one
//! transmitted. A [`SignedRequest`] carries both together and is built fresh
//! for every call.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use quill_core::{Credentials, QuillError};

type HmacSha256 = Hmac<Sha256>;

/// HTTP method named in the signed request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Format a timestamp as RFC-1123 with second precision, always in GMT.
pub fn rfc1123_timestamp(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The exact text that gets HMAC-signed.
pub fn signing_string(host: &str, date: &str, method: Method, path: &str) -> String {
    format!(
        "host: {}\ndate: {}\n{} {} HTTP/1.1",
        host,
        date,
        method.as_str(),
        path
    )
}

/// Base64 of HMAC-SHA256(secret, signing string).
pub fn signature(
    secret: &str,
    host: &str,
    path: &str,
    method: Method,
    date: &str,
) -> Result<String, QuillError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| QuillError::ConfigError(format!("invalid signing key: {e}")))?;
    mac.update(signing_string(host, date, method, path).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// The plain authorization descriptor before its outer base64 wrapping.
pub fn authorization_header(api_key: &str, signature: &str) -> String {
    format!(
        "api_key=\"{}\",algorithm=\"hmac-sha256\",headers=\"host date request-line\",signature=\"{}\"",
        api_key, signature
    )
}

/// Compute the opaque authorization token for one request.
pub fn sign(
    api_key: &str,
    secret: &str,
    host: &str,
    path: &str,
    method: Method,
    date: &str,
) -> Result<String, QuillError> {
    let signature = signature(secret, host, path, method, date)?;
    Ok(STANDARD.encode(authorization_header(api_key, &signature).as_bytes()))
}

/// A signed target, valid only for the instant it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub date: String,
    pub authorization: String,
    pub host: String,
    pub path: String,
}

impl SignedRequest {
    /// Authentication query parameters, in the order they are transmitted.
    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("authorization", self.authorization.as_str()),
            ("date", self.date.as_str()),
            ("host", self.host.as_str()),
        ]
    }

    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full URL with the authentication carried as query parameters.
    pub fn url(&self, scheme: &str) -> String {
        format!(
            "{}://{}{}?{}",
            scheme,
            self.host,
            self.path,
            self.query_string()
        )
    }
}

/// Sign a request against the credentials' endpoint using the current time.
pub fn sign_request(credentials: &Credentials, method: Method) -> Result<SignedRequest, QuillError> {
    sign_request_at(credentials, method, Utc::now())
}

/// Sign a request against the credentials' endpoint at a fixed instant.
pub fn sign_request_at(
    credentials: &Credentials,
    method: Method,
    now: DateTime<Utc>,
) -> Result<SignedRequest, QuillError> {
    let date = rfc1123_timestamp(now);
    let host = credentials.endpoint_host();
    let path = credentials.endpoint_path();
    let authorization = sign(
        credentials.api_key(),
        credentials.api_secret(),
        host,
        path,
        method,
        &date,
    )?;
    debug!(host = %host, path = %path, method = method.as_str(), date = %date, "Signed request");
    Ok(SignedRequest {
        date,
        authorization,
        host: host.to_string(),
        path: path.to_string(),
    })
}
