use serde::Deserialize;

/// Header status of an intermediate reply frame.
pub const STATUS_CONTINUING: i64 = 1;

/// Header status of the terminal reply frame.
pub const STATUS_FINAL: i64 = 2;

/// One inbound unit of a streaming chat session, in arrival order.
///
/// Frames that do not decode are kept verbatim as `Raw` so accumulation
/// never silently loses input.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatFrame {
    Reply(ReplyFrame),
    Raw(String),
}

impl ChatFrame {
    /// Decode one wire message; undecodable text becomes a raw frame.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<ReplyFrame>(text) {
            Ok(frame) => Self::Reply(frame),
            Err(_) => Self::Raw(text.to_string()),
        }
    }

    pub fn status(&self) -> Option<i64> {
        match self {
            Self::Reply(frame) => frame.header.status,
            Self::Raw(_) => None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.status() == Some(STATUS_FINAL)
    }

    /// Non-zero header code reported by the remote service, with its message.
    pub fn remote_error(&self) -> Option<(i64, &str)> {
        match self {
            Self::Reply(frame) if frame.header.code != 0 => {
                Some((frame.header.code, frame.header.message.as_str()))
            }
            _ => None,
        }
    }

    /// Content fragments found under `payload.choices`.
    pub fn choice_texts(&self) -> Vec<&str> {
        let Self::Reply(frame) = self else {
            return Vec::new();
        };
        let items = match frame.payload.as_ref().and_then(|p| p.choices.as_ref()) {
            Some(Choices::Mapping(body)) => body.text.as_slice(),
            Some(Choices::Sequence(items)) => items.as_slice(),
            None => &[],
        };
        non_empty_contents(items)
    }

    /// Content fragments found under `payload.message`, used when no frame
    /// carried anything under `choices`.
    pub fn message_texts(&self) -> Vec<&str> {
        let Self::Reply(frame) = self else {
            return Vec::new();
        };
        let items = match frame.payload.as_ref().and_then(|p| p.message.as_ref()) {
            Some(MessageBody::Mapping { text }) => text.as_slice(),
            Some(MessageBody::Sequence(items)) => items.as_slice(),
            None => &[],
        };
        non_empty_contents(items)
    }
}

fn non_empty_contents(items: &[TextItem]) -> Vec<&str> {
    items
        .iter()
        .map(|item| item.content.as_str())
        .filter(|content| !content.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplyFrame {
    #[serde(default)]
    pub header: FrameHeader,
    #[serde(default)]
    pub payload: Option<FramePayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FrameHeader {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub status: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub choices: Option<Choices>,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

/// `choices` arrives either as `{status, seq, text: [...]}` or as a bare list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Choices {
    Sequence(Vec<TextItem>),
    Mapping(ChoiceBody),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChoiceBody {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub seq: Option<i64>,
    #[serde(default)]
    pub text: Vec<TextItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Sequence(Vec<TextItem>),
    Mapping {
        #[serde(default)]
        text: Vec<TextItem>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextItem {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub index: Option<i64>,
}
