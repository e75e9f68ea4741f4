//! Quill runtime configuration schema.
//!
//! Every section and field is optional on disk; `defaults::apply_all_defaults`
//! fills what the file leaves out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use quill_core::{Credentials, QuillError};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuillConfig {
    /// Streaming chat endpoint used for essay correction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatConfig>,

    /// Document recognition endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr: Option<OcrConfig>,

    /// Local check history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Remote endpoints
// ---------------------------------------------------------------------------

/// App id, key and secret issued for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    #[serde(flatten)]
    pub auth: EndpointAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Model domain, e.g. `4.0Ultra`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Total budget for receiving one reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrConfig {
    #[serde(flatten)]
    pub auth: EndpointAuth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Local state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// NDJSON file, relative paths resolve against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl EndpointAuth {
    /// Build validated credentials for `url`.
    pub fn credentials(&self, section: &str, url: &str) -> Result<Credentials, QuillError> {
        let field = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();
        Credentials::from_url(
            field(&self.app_id),
            field(&self.api_key),
            field(&self.api_secret),
            url,
        )
        .map_err(|e| match e {
            QuillError::ConfigError(msg) => QuillError::ConfigError(format!("{section}: {msg}")),
            other => other,
        })
    }
}

impl ChatConfig {
    pub fn credentials(&self) -> Result<Credentials, QuillError> {
        self.auth.credentials("chat", self.url.as_deref().unwrap_or_default())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_secs.map(Duration::from_secs)
    }
}

impl OcrConfig {
    pub fn credentials(&self) -> Result<Credentials, QuillError> {
        self.auth.credentials("ocr", self.url.as_deref().unwrap_or_default())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl QuillConfig {
    /// Credentials for the chat endpoint, or `ConfigError` naming what is missing.
    pub fn chat_credentials(&self) -> Result<Credentials, QuillError> {
        self.chat
            .as_ref()
            .ok_or_else(|| QuillError::ConfigError("chat section is missing".into()))?
            .credentials()
    }

    /// Credentials for the recognition endpoint, or `ConfigError`.
    pub fn ocr_credentials(&self) -> Result<Credentials, QuillError> {
        self.ocr
            .as_ref()
            .ok_or_else(|| QuillError::ConfigError("ocr section is missing".into()))?
            .credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_with_flattened_auth() {
        let yaml = r#"
chat:
  appId: app-1
  apiKey: key
  apiSecret: secret
  url: wss://spark.example.com/v4.0/chat
  maxTokens: 2048
ocr:
  appId: app-2
logging:
  level: debug
"#;
        let config: QuillConfig = serde_yaml::from_str(yaml).unwrap();
        let chat = config.chat.as_ref().unwrap();
        assert_eq!(chat.auth.app_id.as_deref(), Some("app-1"));
        assert_eq!(chat.max_tokens, Some(2048));
        assert_eq!(config.logging.unwrap().level.as_deref(), Some("debug"));
        assert!(config.history.is_none());
    }

    #[test]
    fn complete_section_yields_credentials() {
        let chat = ChatConfig {
            auth: EndpointAuth {
                app_id: Some("app-1".into()),
                api_key: Some("key".into()),
                api_secret: Some("secret".into()),
            },
            url: Some("wss://spark.example.com/v4.0/chat".into()),
            ..Default::default()
        };
        let creds = chat.credentials().unwrap();
        assert_eq!(creds.app_id(), "app-1");
        assert_eq!(creds.endpoint_host(), "spark.example.com");
        assert_eq!(creds.endpoint_path(), "/v4.0/chat");
    }

    #[test]
    fn missing_secret_is_config_error() {
        let config = QuillConfig {
            ocr: Some(OcrConfig {
                auth: EndpointAuth {
                    app_id: Some("app".into()),
                    api_key: Some("key".into()),
                    api_secret: Some("   ".into()),
                },
                url: Some("https://ocr.example.com/v1/doc".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = config.ocr_credentials().unwrap_err();
        assert_eq!(err.kind(), quill_core::ErrorKind::Config);
        assert!(err.to_string().contains("ocr"));
    }
}
