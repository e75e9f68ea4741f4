//! Wire payloads for the recognition and chat endpoints.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use quill_core::ImageFormat;

/// Request/response status meaning "the whole input is in this one message".
pub const STATUS_SINGLE_CHUNK: i64 = 3;

// ---------------------------------------------------------------------------
// Recognition request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RecognitionRequest<'a> {
    pub header: RecognitionHeader<'a>,
    pub parameter: RecognitionParameter,
    pub payload: RecognitionPayload,
}

#[derive(Debug, Serialize)]
pub struct RecognitionHeader<'a> {
    pub app_id: &'a str,
    pub status: i64,
}

#[derive(Debug, Serialize)]
pub struct RecognitionParameter {
    #[serde(rename = "hh_ocr_recognize_doc")]
    pub capability: RecognitionCapability,
}

#[derive(Debug, Serialize)]
pub struct RecognitionCapability {
    #[serde(rename = "recognizeDocumentRes")]
    pub result: ResultFormat,
}

#[derive(Debug, Serialize)]
pub struct ResultFormat {
    pub encoding: &'static str,
    pub compress: &'static str,
    pub format: &'static str,
}

impl Default for ResultFormat {
    fn default() -> Self {
        Self {
            encoding: "utf8",
            compress: "raw",
            format: "json",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecognitionPayload {
    pub image: ImagePayload,
}

#[derive(Debug, Serialize)]
pub struct ImagePayload {
    pub encoding: &'static str,
    /// Base64 of the raw image bytes.
    pub image: String,
    pub status: i64,
}

/// Build the single-shot recognition request for one image.
pub fn recognition_request<'a>(
    app_id: &'a str,
    image: &[u8],
    format: ImageFormat,
) -> RecognitionRequest<'a> {
    RecognitionRequest {
        header: RecognitionHeader {
            app_id,
            status: STATUS_SINGLE_CHUNK,
        },
        parameter: RecognitionParameter {
            capability: RecognitionCapability {
                result: ResultFormat::default(),
            },
        },
        payload: RecognitionPayload {
            image: ImagePayload {
                encoding: format.as_str(),
                image: STANDARD.encode(image),
                status: STATUS_SINGLE_CHUNK,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Recognition response
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RecognitionResponse {
    pub header: ResponseHeader,
    #[serde(default)]
    pub payload: Option<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionResult {
    #[serde(rename = "recognizeDocumentRes", default)]
    pub result: Option<EncodedText>,
}

#[derive(Debug, Deserialize)]
pub struct EncodedText {
    /// Base64 of a JSON document.
    pub text: String,
}

/// The decoded inner document.
#[derive(Debug, Deserialize)]
pub struct RecognizedDocument {
    pub whole_text: Option<String>,
}

// ---------------------------------------------------------------------------
// Chat request
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub header: ChatHeader<'a>,
    pub parameter: ChatParameter<'a>,
    pub payload: ChatPayload<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChatHeader<'a> {
    pub app_id: &'a str,
    pub uid: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ChatParameter<'a> {
    pub chat: ChatSettings<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChatSettings<'a> {
    pub domain: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatPayload<'a> {
    pub message: ChatMessages<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessages<'a> {
    pub text: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Build the single request frame of a chat session.
pub fn chat_request<'a>(
    app_id: &'a str,
    uid: &'a str,
    settings: ChatSettings<'a>,
    prompt: &'a str,
) -> ChatRequest<'a> {
    ChatRequest {
        header: ChatHeader { app_id, uid },
        parameter: ChatParameter { chat: settings },
        payload: ChatPayload {
            message: ChatMessages {
                text: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            },
        },
    }
}

/// Wrap an essay in the correction instructions.
///
/// The section labels requested here are the ones the extractor looks for.
pub fn build_essay_prompt(essay: &str) -> String {
    format!(
        "请批改以下英语作文，要求：\n\
         1. 在“语法错误：”下列出主要语法问题，包括拼写、标点、时态、主谓一致等\n\
         2. 在“详细错误分析：”下逐条说明每个错误，每条包含“原始:”“修改:”“类型:”“解释:”四行\n\
         3. 同时用```json代码块返回错误列表，格式为{{\"errors\":[{{\"original\":\"\",\"corrected\":\"\",\"error_type\":\"\",\"explanation\":\"\"}}],\"improvement_suggestions\":[],\"corrected_text\":\"\"}}\n\
         4. 在“修改后的文本：”下给出修改后的完整文本\n\
         5. 在“改进建议：”下给出不超过三条改进建议\n\n\
         作文内容：\n{}",
        essay
    )
}
