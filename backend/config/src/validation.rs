//! Config validation: range and scheme checks with user-friendly messages.
//!
//! Credential completeness is checked separately by
//! [`QuillConfig::validate`](crate::schema::QuillConfig::validate), since
//! a command that only reads history does not need any.

use crate::schema::QuillConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &QuillConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_chat(config, &mut report);
    validate_ocr(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn check_scheme(report: &mut ValidationReport, path: &str, url: Option<&str>, schemes: &[&str]) {
    let Some(url) = url else { return };
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    if !scheme.is_some_and(|s| schemes.contains(&s)) {
        report.error(
            path,
            format!("URL '{url}' must use one of: {}", schemes.join(", ")),
        );
    }
}

fn check_timeout(report: &mut ValidationReport, path: &str, secs: Option<u64>) {
    if secs == Some(0) {
        report.error(path, "timeout must be at least one second");
    }
}

/// Validate chat endpoint settings.
fn validate_chat(config: &QuillConfig, report: &mut ValidationReport) {
    let Some(chat) = &config.chat else { return };
    check_scheme(report, "chat.url", chat.url.as_deref(), &["wss", "ws"]);
    if chat.url.as_deref().is_some_and(|u| u.starts_with("ws://")) {
        report.warn("chat.url", "Unencrypted websocket; credentials travel in the clear");
    }
    if let Some(t) = chat.temperature {
        if !(t > 0.0 && t <= 1.0) {
            report.error("chat.temperature", format!("temperature {t} must be in (0, 1]"));
        }
    }
    if let Some(max) = chat.max_tokens {
        if max == 0 || max > 8192 {
            report.error("chat.maxTokens", format!("maxTokens {max} must be in 1..=8192"));
        }
    }
    check_timeout(report, "chat.connectTimeoutSecs", chat.connect_timeout_secs);
    check_timeout(report, "chat.receiveTimeoutSecs", chat.receive_timeout_secs);
}

/// Validate recognition endpoint settings.
fn validate_ocr(config: &QuillConfig, report: &mut ValidationReport) {
    let Some(ocr) = &config.ocr else { return };
    check_scheme(report, "ocr.url", ocr.url.as_deref(), &["https", "http"]);
    check_timeout(report, "ocr.timeoutSecs", ocr.timeout_secs);
}

fn validate_logging(config: &QuillConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    if !matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        report.warn(
            "logging.level",
            format!("Unknown level '{level}'; treating it as a filter directive"),
        );
    }
}
