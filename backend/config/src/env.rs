//! Environment variable substitution and overrides for config values.
//!
//! Supports `${VAR_NAME}` syntax in string values, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched.
//! `$${VAR}` escapes to a literal `${VAR}`.
//!
//! After substitution, the deployment variables listed in [`OVERRIDES`]
//! replace whatever the file says.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{ChatConfig, EndpointAuth, OcrConfig, QuillConfig};

/// A reference, optionally preceded by the `$` that escapes it.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree, looking
/// them up in `env`.
///
/// Walks the entire value tree recursively; only string leaves are processed.
/// Returns an error if any referenced env var is not set or is empty.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        // Primitives pass through unchanged.
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Which credential slot an override variable fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    AppId,
    ApiKey,
    ApiSecret,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Chat,
    Ocr,
}

/// Environment variables that override file values, as named by the
/// deployments this client talks to.
const OVERRIDES: [(&str, Section, Slot); 7] = [
    ("APPID", Section::Chat, Slot::AppId),
    ("APIKey", Section::Chat, Slot::ApiKey),
    ("APISecret", Section::Chat, Slot::ApiSecret),
    ("OCR_APPID", Section::Ocr, Slot::AppId),
    ("OCR_API_KEY", Section::Ocr, Slot::ApiKey),
    ("OCR_API_SECRET", Section::Ocr, Slot::ApiSecret),
    ("OCR_URL", Section::Ocr, Slot::Url),
];

/// Apply overrides from `env`. Empty values are ignored.
pub fn apply_env_overrides_with(
    mut config: QuillConfig,
    env: &HashMap<String, String>,
) -> QuillConfig {
    for (var, section, slot) in OVERRIDES {
        let Some(value) = env.get(var).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            continue;
        };
        let (auth, url) = match section {
            Section::Chat => {
                let chat = config.chat.get_or_insert_with(ChatConfig::default);
                (&mut chat.auth, &mut chat.url)
            }
            Section::Ocr => {
                let ocr = config.ocr.get_or_insert_with(OcrConfig::default);
                (&mut ocr.auth, &mut ocr.url)
            }
        };
        *slot_mut(auth, url, slot) = Some(value.to_string());
        tracing::debug!(var, "Config value overridden from environment");
    }
    config
}

fn slot_mut<'a>(
    auth: &'a mut EndpointAuth,
    url: &'a mut Option<String>,
    slot: Slot,
) -> &'a mut Option<String> {
    match slot {
        Slot::AppId => &mut auth.app_id,
        Slot::ApiKey => &mut auth.api_key,
        Slot::ApiSecret => &mut auth.api_secret,
        Slot::Url => url,
    }
}
