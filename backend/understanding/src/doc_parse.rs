//! Document text intake
//!
//! Classifies uploaded files by name and pulls plain text out of Word
//! containers and text files. Images are left to the recognition client.

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use quill_core::{ImageFormat, QuillError, SourceType};

const DOCUMENT_XML: &str = "word/document.xml";

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").unwrap());

static TEXT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").unwrap());

/// What kind of input an uploaded file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Word,
    Image(ImageFormat),
    PlainText,
    Unsupported,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Self {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Self::Unsupported;
        };
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Self::Word,
            "png" | "jpg" | "jpeg" | "gif" => Self::Image(ImageFormat::from_extension(ext)),
            "txt" | "md" => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    /// History source type for this input, if it is supported at all.
    pub fn source_type(&self) -> Option<SourceType> {
        match self {
            Self::Word => Some(SourceType::Word),
            Self::Image(_) => Some(SourceType::Image),
            Self::PlainText => Some(SourceType::Text),
            Self::Unsupported => None,
        }
    }
}

/// Join the text of every non-blank paragraph of a .docx file with newlines.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, QuillError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| QuillError::DecodeError(format!("not a docx container: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| QuillError::DecodeError(format!("missing {DOCUMENT_XML}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| QuillError::DecodeError(format!("unreadable {DOCUMENT_XML}: {e}")))?;

    let text = paragraphs_from_xml(&xml).join("\n");
    info!(chars = text.chars().count(), "Extracted Word document text");
    Ok(text)
}

fn paragraphs_from_xml(xml: &str) -> Vec<String> {
    PARAGRAPH_RE
        .find_iter(xml)
        .map(|p| {
            TEXT_RUN_RE
                .captures_iter(p.as_str())
                .map(|caps| unescape_xml(&caps[1]))
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Decode a text upload, dropping a UTF-8 byte-order mark.
pub fn extract_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes).into_owned();
    debug!(chars = text.chars().count(), "Decoded plain text upload");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            zip.start_file(DOCUMENT_XML, options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn classifies_file_names() {
        assert_eq!(DocumentKind::from_file_name("essay.DOCX"), DocumentKind::Word);
        assert_eq!(
            DocumentKind::from_file_name("scan.png"),
            DocumentKind::Image(ImageFormat::Png)
        );
        assert_eq!(
            DocumentKind::from_file_name("scan.jpeg"),
            DocumentKind::Image(ImageFormat::Jpg)
        );
        assert_eq!(DocumentKind::from_file_name("notes.txt"), DocumentKind::PlainText);
        assert_eq!(DocumentKind::from_file_name("slides.pptx"), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::from_file_name("README"), DocumentKind::Unsupported);
        assert_eq!(DocumentKind::Word.source_type(), Some(SourceType::Word));
    }

    #[test]
    fn extracts_paragraph_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:t>My </w:t></w:r><w:r><w:t xml:space="preserve">school &amp; me</w:t></w:r></w:p>
            <w:p><w:r><w:t>   </w:t></w:r></w:p>
            <w:p/>
            <w:p w:rsidR="00A1"><w:r><w:tab/><w:t>Second line</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = extract_docx_text(&docx_with(xml)).unwrap();
        assert_eq!(text, "My school & me\nSecond line");
    }

    #[test]
    fn non_zip_is_decode_error() {
        let err = extract_docx_text(b"plain bytes").unwrap_err();
        assert_eq!(err.kind(), quill_core::ErrorKind::Decode);
    }

    #[test]
    fn plain_text_strips_bom() {
        assert_eq!(extract_plain_text(b"\xef\xbb\xbfHello"), "Hello");
    }
}
