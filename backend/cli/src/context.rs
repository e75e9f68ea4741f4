//! Runtime context shared by the subcommands: the prepared config, where it
//! came from, and constructors for the service clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use quill_config::defaults::{
    DEFAULT_HISTORY_FILE, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_OCR_TIMEOUT_SECS,
};
use quill_config::{
    config_dir, config_file_path, load_and_prepare, resolve_path, ConfigValidationError,
    QuillConfig,
};
use quill_core::{DocumentRecognizer, ImageFormat, QuillError};
use quill_history::HistoryStore;
use quill_spark::{ChatClient, ChatOptions, RecognitionClient, SparkService};

pub struct AppContext {
    pub config: QuillConfig,
    /// Directory relative paths in the config resolve against.
    pub base_dir: PathBuf,
    /// Validation warnings, held until logging is up.
    pub warnings: Vec<ConfigValidationError>,
}

/// Whether a command will send images to the recognition endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognition {
    Needed,
    NotNeeded,
}

/// Stands in for the recognition client when the command never reads images.
struct RecognitionDisabled;

#[async_trait]
impl DocumentRecognizer for RecognitionDisabled {
    async fn recognize(&self, _image: &[u8], _format: ImageFormat) -> Result<String, QuillError> {
        Err(QuillError::ConfigError(
            "recognition credentials were not loaded for this command".into(),
        ))
    }
}

impl AppContext {
    /// Load `explicit` if given, otherwise `quill.yaml` in the config directory.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, base_dir) = match explicit {
            Some(path) => {
                let base = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (path.to_path_buf(), base)
            }
            None => {
                let dir = config_dir();
                (config_file_path(&dir), dir)
            }
        };
        let prepared = load_and_prepare(&path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        Ok(Self {
            config: prepared.config,
            base_dir,
            warnings: prepared.warnings,
        })
    }

    /// Emit the config warnings collected by [`AppContext::load`].
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
    }

    pub fn log_level(&self) -> &str {
        self.config
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> PathBuf {
        let dir = self
            .config
            .logging
            .as_ref()
            .and_then(|l| l.dir.as_deref())
            .unwrap_or(DEFAULT_LOG_DIR);
        resolve_path(&self.base_dir, dir)
    }

    pub fn history_path(&self) -> PathBuf {
        let file = self
            .config
            .history
            .as_ref()
            .and_then(|h| h.path.as_deref())
            .unwrap_or(DEFAULT_HISTORY_FILE);
        resolve_path(&self.base_dir, file)
    }

    pub async fn history(&self) -> Result<HistoryStore> {
        let path = self.history_path();
        let store = HistoryStore::open(&path)
            .await
            .with_context(|| format!("Failed to open history at {}", path.display()))?;
        Ok(store)
    }

    pub fn chat_options(&self) -> ChatOptions {
        let defaults = ChatOptions::default();
        let Some(chat) = &self.config.chat else {
            return defaults;
        };
        ChatOptions {
            domain: chat.domain.clone().unwrap_or(defaults.domain),
            temperature: chat.temperature.unwrap_or(defaults.temperature),
            max_tokens: chat.max_tokens.unwrap_or(defaults.max_tokens),
            connect_timeout: chat.connect_timeout().unwrap_or(defaults.connect_timeout),
            receive_timeout: chat.receive_timeout().unwrap_or(defaults.receive_timeout),
        }
    }

    /// Build the service. Chat credentials are always required; recognition
    /// credentials only when `recognition` is [`Recognition::Needed`].
    pub fn service(&self, recognition: Recognition) -> Result<SparkService> {
        let chat_credentials = self
            .config
            .chat_credentials()
            .context("Chat credentials are incomplete; set them in quill.yaml or the environment")?;
        let checker = ChatClient::new(chat_credentials, self.chat_options());

        let recognizer: Arc<dyn DocumentRecognizer> = match recognition {
            Recognition::Needed => {
                let ocr_credentials = self.config.ocr_credentials().context(
                    "Recognition credentials are incomplete; set them in quill.yaml or the environment",
                )?;
                let timeout = self
                    .config
                    .ocr
                    .as_ref()
                    .and_then(|o| o.timeout())
                    .unwrap_or(Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS));
                Arc::new(RecognitionClient::new(ocr_credentials, timeout)?)
            }
            Recognition::NotNeeded => Arc::new(RecognitionDisabled),
        };
        Ok(SparkService::new(recognizer, Arc::new(checker)))
    }
}
