use std::fmt;

use crate::error::QuillError;

/// Account credentials and target endpoint for one remote capability.
///
/// Immutable once built; construction fails with `ConfigError` when any
/// part is missing, so a client can never exist without complete credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    api_key: String,
    api_secret: String,
    endpoint_host: String,
    endpoint_path: String,
}

impl Credentials {
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        endpoint_host: impl Into<String>,
        endpoint_path: impl Into<String>,
    ) -> Result<Self, QuillError> {
        let credentials = Self {
            app_id: app_id.into().trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            api_secret: api_secret.into().trim().to_string(),
            endpoint_host: endpoint_host.into().trim().to_string(),
            endpoint_path: endpoint_path.into().trim().to_string(),
        };

        let missing: Vec<&str> = [
            ("app_id", &credentials.app_id),
            ("api_key", &credentials.api_key),
            ("api_secret", &credentials.api_secret),
            ("endpoint_host", &credentials.endpoint_host),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(QuillError::ConfigError(format!(
                "incomplete credentials, missing: {}",
                missing.join(", ")
            )));
        }
        if !credentials.endpoint_path.starts_with('/') {
            return Err(QuillError::ConfigError(format!(
                "endpoint path must start with '/': {:?}",
                credentials.endpoint_path
            )));
        }

        Ok(credentials)
    }

    /// Build credentials from an endpoint URL such as
    /// `https://api.example.com/v1/private/ocr`. The scheme is discarded;
    /// each client picks its own.
    pub fn from_url(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        url: &str,
    ) -> Result<Self, QuillError> {
        let rest = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(|| QuillError::ConfigError(format!("endpoint url has no scheme: {url}")))?;
        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        Self::new(app_id, api_key, api_secret, host, path)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn endpoint_host(&self) -> &str {
        &self.endpoint_host
    }

    pub fn endpoint_path(&self) -> &str {
        &self.endpoint_path
    }
}

// The secret must never reach a log line.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("endpoint_host", &self.endpoint_host)
            .field("endpoint_path", &self.endpoint_path)
            .finish()
    }
}
