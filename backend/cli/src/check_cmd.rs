//! `quill check`: read an essay from a file or the command line, correct it,
//! print the result and record it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::info;

use quill_core::{CorrectionResult, SourceType};
use quill_understanding::{extract_docx_text, extract_plain_text, DocumentKind};

use crate::context::{AppContext, Recognition};
use crate::terminal_output::{note_error, note_success, note_warn};

/// Message shown when an image cannot be read, so the user can paste the text.
pub const OCR_FALLBACK_MESSAGE: &str = "OCR failed, please enter the essay text manually";

pub struct CheckArgs {
    pub file: Option<PathBuf>,
    pub text: Option<String>,
    pub no_history: bool,
}

/// Essay text ready for checking, or the reason there is none.
enum Intake {
    Ready { text: String, source_type: SourceType },
    OcrFailed,
}

pub async fn run(ctx: &AppContext, args: CheckArgs) -> Result<ExitCode> {
    let service = ctx.service(recognition_for(&args))?;

    let intake = match (&args.text, &args.file) {
        (Some(text), _) => Intake::Ready {
            text: text.clone(),
            source_type: SourceType::Text,
        },
        (None, Some(path)) => read_file(&service, path).await?,
        (None, None) => bail!("Provide an essay file or --text"),
    };

    let (text, source_type) = match intake {
        Intake::Ready { text, source_type } => (text, source_type),
        Intake::OcrFailed => {
            note_error(OCR_FALLBACK_MESSAGE);
            return Ok(ExitCode::FAILURE);
        }
    };
    if text.trim().is_empty() {
        note_error("The essay is empty");
        return Ok(ExitCode::FAILURE);
    }

    info!(chars = text.chars().count(), %source_type, "Checking essay");
    let result = if args.no_history {
        service.check_essay(&text).await
    } else {
        let history = ctx.history().await?;
        service.check_and_record(&text, source_type, &history).await
    };

    if result == CorrectionResult::safe_default() {
        note_warn("No correction was produced; showing the generic result");
    } else {
        note_success("Essay checked");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

async fn read_file(service: &quill_spark::SparkService, path: &Path) -> Result<Intake> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let kind = DocumentKind::from_file_name(name);
    let Some(source_type) = kind.source_type() else {
        bail!(unsupported(path));
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let text = match kind {
        DocumentKind::Word => extract_docx_text(&bytes)
            .with_context(|| format!("Failed to read Word document {}", path.display()))?,
        DocumentKind::PlainText => extract_plain_text(&bytes),
        DocumentKind::Image(format) => match service.recognize_document(&bytes, format).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Recognition failed");
                return Ok(Intake::OcrFailed);
            }
        },
        DocumentKind::Unsupported => bail!(unsupported(path)),
    };
    Ok(Intake::Ready { text, source_type })
}

/// Only an image file, with no inline text, goes through recognition.
fn recognition_for(args: &CheckArgs) -> Recognition {
    let name = args
        .file
        .as_deref()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());
    let reads_image = args.text.is_none()
        && name.is_some_and(|n| matches!(DocumentKind::from_file_name(n), DocumentKind::Image(_)));
    if reads_image {
        Recognition::Needed
    } else {
        Recognition::NotNeeded
    }
}

fn unsupported(path: &Path) -> String {
    format!(
        "Unsupported file type: {} (use .txt, .md, .docx, .png, .jpg, .jpeg or .gif)",
        path.display()
    )
}
