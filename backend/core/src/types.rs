use std::fmt;

use serde::{Deserialize, Serialize};

/// Most improvement suggestions kept in a result.
pub const MAX_SUGGESTIONS: usize = 3;

/// Most summary grammar errors kept in a result.
pub const MAX_GRAMMAR_ERRORS: usize = 3;

/// Most detailed error records kept in a result.
pub const MAX_DETAILED_ERRORS: usize = 5;

/// Generic suggestions used when the reply carries none.
pub const DEFAULT_SUGGESTIONS: [&str; 3] =
    ["增强论点的说服力", "改善句子结构多样性", "增加具体例子"];

/// Generic grammar errors used when the reply carries none.
pub const DEFAULT_GRAMMAR_ERRORS: [&str; 2] = ["时态使用不当", "主谓一致问题"];

/// One corrected mistake. All four fields are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedError {
    pub original: String,
    pub corrected: String,
    pub error_type: String,
    pub explanation: String,
}

impl DetailedError {
    /// Build a record, rejecting it if any field is blank.
    pub fn new(
        original: impl Into<String>,
        corrected: impl Into<String>,
        error_type: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Option<Self> {
        let record = Self {
            original: original.into().trim().to_string(),
            corrected: corrected.into().trim().to_string(),
            error_type: error_type.into().trim().to_string(),
            explanation: explanation.into().trim().to_string(),
        };
        let complete = !record.original.is_empty()
            && !record.corrected.is_empty()
            && !record.error_type.is_empty()
            && !record.explanation.is_empty();
        complete.then_some(record)
    }
}

/// Structured outcome of an essay check.
///
/// Every field is always populated, possibly with the generic defaults, so
/// callers can render a result even when extraction or transport failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub feedback: String,
    pub suggestions: Vec<String>,
    pub grammar_errors: Vec<String>,
    pub detailed_errors: Vec<DetailedError>,
    pub corrected_text: String,
}

impl CorrectionResult {
    /// The result returned when no correction is available.
    pub fn safe_default() -> Self {
        Self {
            feedback: String::new(),
            suggestions: default_suggestions(),
            grammar_errors: default_grammar_errors(),
            detailed_errors: Vec::new(),
            corrected_text: String::new(),
        }
    }

    /// Truncate every list to its cap.
    pub fn capped(mut self) -> Self {
        self.suggestions.truncate(MAX_SUGGESTIONS);
        self.grammar_errors.truncate(MAX_GRAMMAR_ERRORS);
        self.detailed_errors.truncate(MAX_DETAILED_ERRORS);
        self
    }
}

impl Default for CorrectionResult {
    fn default() -> Self {
        Self::safe_default()
    }
}

pub fn default_suggestions() -> Vec<String> {
    DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

pub fn default_grammar_errors() -> Vec<String> {
    DEFAULT_GRAMMAR_ERRORS.iter().map(|s| s.to_string()).collect()
}

/// Where the checked essay text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Text,
    Word,
    Image,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Word => "word",
            Self::Image => "image",
        };
        write!(f, "{}", s)
    }
}

/// Image encodings accepted by the recognition endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpg,
    Png,
}

impl ImageFormat {
    /// Map a file extension to a format. Unknown extensions fall back to jpg.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            _ => Self::Jpg,
        }
    }

    /// Detect the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPG_MAGIC: &[u8] = b"\xff\xd8\xff";
        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPG_MAGIC) {
            Some(Self::Jpg)
        } else {
            None
        }
    }

    /// Wire name used in the recognition payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_default_is_fully_populated() {
        let result = CorrectionResult::safe_default();
        assert_eq!(result.suggestions.len(), 3);
        assert_eq!(result.grammar_errors.len(), 2);
        assert!(result.detailed_errors.is_empty());
        assert!(result.feedback.is_empty());
        assert!(result.corrected_text.is_empty());
    }

    #[test]
    fn detailed_error_rejects_blank_fields() {
        assert!(DetailedError::new("a", "b", "t", "e").is_some());
        assert!(DetailedError::new("a", "b", "t", "  ").is_none());
        assert!(DetailedError::new("", "b", "t", "e").is_none());
    }

    #[test]
    fn capped_truncates_lists() {
        let record = DetailedError::new("a", "b", "t", "e").unwrap();
        let result = CorrectionResult {
            feedback: String::new(),
            suggestions: vec!["s".into(); 7],
            grammar_errors: vec!["g".into(); 4],
            detailed_errors: vec![record; 9],
            corrected_text: String::new(),
        }
        .capped();
        assert_eq!(result.suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(result.grammar_errors.len(), MAX_GRAMMAR_ERRORS);
        assert_eq!(result.detailed_errors.len(), MAX_DETAILED_ERRORS);
    }

    #[test]
    fn image_format_from_extension_and_magic() {
        assert_eq!(ImageFormat::from_extension("PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_extension(".jpeg"), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_extension("gif"), ImageFormat::Jpg);
        assert_eq!(
            ImageFormat::sniff(b"\x89PNG\r\n\x1a\n rest"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a"), None);
    }

    #[test]
    fn source_type_serializes_snake_case() {
        let json = serde_json::to_string(&SourceType::Word).unwrap();
        assert_eq!(json, "\"word\"");
    }
}
