//! Remote service clients: document recognition over HTTPS and essay
//! correction over a streaming chat session.

pub mod chat;
pub mod ocr;
pub mod service;
pub mod session;
pub mod transport;
pub mod wire;

pub use chat::{ChatClient, ChatOptions, DEFAULT_DOMAIN, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
pub use ocr::{decode_reply, HttpReply, HttpTransport, RecognitionClient, ReqwestTransport};
pub use service::SparkService;
pub use session::{
    ChatSession, SessionLimits, SessionState, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT,
};
pub use transport::{Connector, FrameTransport, WsConnector, WsTransport};
pub use wire::{build_essay_prompt, chat_request, recognition_request, ChatSettings};
