//! Streaming chat client used for essay correction.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use quill_core::{ChatFrame, CorrectionResult, Credentials, EssayChecker, QuillError};
use quill_security::{sign_request, Method};
use quill_understanding::extract;

use crate::session::{ChatSession, SessionLimits, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT};
use crate::transport::{Connector, WsConnector};
use crate::wire::{build_essay_prompt, chat_request, ChatSettings};

pub const DEFAULT_DOMAIN: &str = "4.0Ultra";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub domain: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
    pub receive_timeout: Duration,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

impl ChatOptions {
    fn limits(&self) -> SessionLimits {
        SessionLimits {
            connect_timeout: self.connect_timeout,
            receive_timeout: self.receive_timeout,
        }
    }
}

/// Client for the streaming chat endpoint.
pub struct ChatClient<C = WsConnector> {
    credentials: Credentials,
    options: ChatOptions,
    connector: C,
}

impl ChatClient<WsConnector> {
    pub fn new(credentials: Credentials, options: ChatOptions) -> Self {
        Self::with_connector(credentials, options, WsConnector)
    }
}

impl<C: Connector> ChatClient<C> {
    pub fn with_connector(credentials: Credentials, options: ChatOptions, connector: C) -> Self {
        Self {
            credentials,
            options,
            connector,
        }
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    /// Run one session for `prompt` and return every frame through the final one.
    pub async fn converse(&self, prompt: &str) -> Result<Vec<ChatFrame>, QuillError> {
        let signed = sign_request(&self.credentials, Method::Get)?;
        let url = signed.url("wss");
        let uid = Uuid::new_v4().simple().to_string();
        let settings = ChatSettings {
            domain: &self.options.domain,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };
        let request = serde_json::to_string(&chat_request(
            self.credentials.app_id(),
            &uid,
            settings,
            prompt,
        ))?;

        info!(
            host = self.credentials.endpoint_host(),
            domain = %self.options.domain,
            prompt_chars = prompt.chars().count(),
            "Starting chat session"
        );
        let mut session = ChatSession::new(self.options.limits());
        let frames = session.run(&self.connector, &url, request).await?;
        Ok(frames)
    }

    /// Correct an essay. Never fails: any error yields the safe default.
    pub async fn check_essay(&self, essay: &str) -> CorrectionResult {
        let prompt = build_essay_prompt(essay);
        match self.converse(&prompt).await {
            Ok(frames) => {
                let result = extract(&frames);
                info!(
                    grammar_errors = result.grammar_errors.len(),
                    detailed_errors = result.detailed_errors.len(),
                    "Essay check complete"
                );
                result
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Essay check failed, returning default result");
                CorrectionResult::safe_default()
            }
        }
    }
}

#[async_trait]
impl<C: Connector> EssayChecker for ChatClient<C> {
    async fn check_essay(&self, essay: &str) -> CorrectionResult {
        ChatClient::check_essay(self, essay).await
    }
}
