//! `quill-config`: runtime configuration for quill.
//!
//! Provides:
//! - Typed config schema for the chat and recognition endpoints
//! - YAML loading from the config directory
//! - `${ENV_VAR}` substitution and deployment env overrides
//! - Default value application
//! - Range and scheme validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use schema::{ChatConfig, EndpointAuth, HistoryConfig, LoggingConfig, OcrConfig, QuillConfig};
pub use io::{config_dir, config_file_path, load_config, resolve_path};
pub use env::{apply_env_overrides_with, resolve_env_vars_with, MissingEnvVarError};
pub use defaults::apply_all_defaults;
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// A config ready for use, plus the validation warnings it produced.
///
/// Warnings are handed back rather than logged because config is loaded
/// before the subscriber exists.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: QuillConfig,
    pub warnings: Vec<ConfigValidationError>,
}

/// Load, substitute env vars, apply env overrides and defaults, and validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<PreparedConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    prepare(load_config(path).await?, &env)
}

/// The processing half of [`load_and_prepare`], over an explicit environment.
///
/// Fails with every validation error joined into one message.
pub fn prepare(raw_config: QuillConfig, env: &HashMap<String, String>) -> Result<PreparedConfig> {
    // Serialize to Value for the env substitution pass.
    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;

    let config: QuillConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_env_overrides_with(config, env);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    if !report.is_valid() {
        let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!(errors.join("; "));
    }

    Ok(PreparedConfig {
        config,
        warnings: report.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_runs_the_whole_pipeline() {
        let raw: QuillConfig = serde_yaml::from_str(
            "chat:\n  apiKey: ${SPARK_KEY}\n  apiSecret: file-secret\nocr:\n  appId: ocr-app\n",
        )
        .unwrap();
        let env: HashMap<String, String> = [("SPARK_KEY", "key-from-var"), ("APPID", "chat-app")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let prepared = prepare(raw, &env).unwrap();
        assert!(prepared.warnings.is_empty());
        let config = prepared.config;

        let creds = config.chat_credentials().unwrap();
        assert_eq!(creds.app_id(), "chat-app");
        assert_eq!(creds.api_key(), "key-from-var");
        assert_eq!(creds.endpoint_host(), "spark-api.xf-yun.com");
        // OCR has no key or secret yet.
        assert!(config.ocr_credentials().is_err());
    }

    #[test]
    fn invalid_values_fail_preparation() {
        let raw: QuillConfig = serde_yaml::from_str("chat:\n  temperature: 3.0\n").unwrap();
        let err = prepare(raw, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("chat.temperature"));
    }

    #[test]
    fn every_error_is_reported() {
        let raw: QuillConfig =
            serde_yaml::from_str("chat:\n  temperature: 3.0\n  maxTokens: 0\n").unwrap();
        let message = prepare(raw, &HashMap::new()).unwrap_err().to_string();
        assert!(message.contains("chat.temperature"));
        assert!(message.contains("chat.maxTokens"));
    }

    #[test]
    fn warnings_are_returned_to_the_caller() {
        let raw: QuillConfig = serde_yaml::from_str(
            "chat:\n  url: ws://spark.example.com/v4.0/chat\nlogging:\n  level: chatty\n",
        )
        .unwrap();
        let prepared = prepare(raw, &HashMap::new()).unwrap();
        let paths: Vec<&str> = prepared.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(paths, vec!["chat.url", "logging.level"]);
    }
}
