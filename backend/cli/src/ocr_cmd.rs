//! `quill ocr`: print the text recognized in an image.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use quill_core::ImageFormat;

use crate::check_cmd::OCR_FALLBACK_MESSAGE;
use crate::context::{AppContext, Recognition};
use crate::terminal_output::{note_error, note_warn};

pub async fn run(ctx: &AppContext, image: &Path) -> Result<ExitCode> {
    let service = ctx.service(Recognition::Needed)?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let hint = image
        .extension()
        .and_then(|e| e.to_str())
        .map(ImageFormat::from_extension)
        .unwrap_or_default();

    match service.recognize_document(&bytes, hint).await {
        Ok(text) => {
            if text.trim().is_empty() {
                note_warn("No text was found in the image");
            }
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            note_error(&format!("{OCR_FALLBACK_MESSAGE} ({e})"));
            Ok(ExitCode::FAILURE)
        }
    }
}
