//! Config defaults: applies default values to parsed config.

use crate::schema::{ChatConfig, HistoryConfig, LoggingConfig, OcrConfig, QuillConfig};

pub const DEFAULT_CHAT_URL: &str = "wss://spark-api.xf-yun.com/v4.0/chat";
pub const DEFAULT_CHAT_DOMAIN: &str = "4.0Ultra";
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_OCR_URL: &str = "https://api.xf-yun.com/v1/private/hh_ocr_recognize_doc";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_HISTORY_FILE: &str = "history.ndjson";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: QuillConfig) -> QuillConfig {
    let config = apply_chat_defaults(config);
    let config = apply_ocr_defaults(config);
    apply_local_defaults(config)
}

fn apply_chat_defaults(mut config: QuillConfig) -> QuillConfig {
    let chat = config.chat.get_or_insert_with(ChatConfig::default);
    chat.url.get_or_insert_with(|| DEFAULT_CHAT_URL.to_string());
    chat.domain.get_or_insert_with(|| DEFAULT_CHAT_DOMAIN.to_string());
    chat.temperature.get_or_insert(DEFAULT_CHAT_TEMPERATURE);
    chat.max_tokens.get_or_insert(DEFAULT_CHAT_MAX_TOKENS);
    chat.connect_timeout_secs.get_or_insert(DEFAULT_CONNECT_TIMEOUT_SECS);
    chat.receive_timeout_secs.get_or_insert(DEFAULT_RECEIVE_TIMEOUT_SECS);
    config
}

fn apply_ocr_defaults(mut config: QuillConfig) -> QuillConfig {
    let ocr = config.ocr.get_or_insert_with(OcrConfig::default);
    ocr.url.get_or_insert_with(|| DEFAULT_OCR_URL.to_string());
    ocr.timeout_secs.get_or_insert(DEFAULT_OCR_TIMEOUT_SECS);
    config
}

/// History file and logging.
fn apply_local_defaults(mut config: QuillConfig) -> QuillConfig {
    let history = config.history.get_or_insert_with(HistoryConfig::default);
    history.path.get_or_insert_with(|| DEFAULT_HISTORY_FILE.to_string());

    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}
