pub mod doc_parse;
pub mod extract;

pub use doc_parse::{extract_docx_text, extract_plain_text, DocumentKind};
pub use extract::{concat_frames, extract, extract_from_text};
