use std::path::Path;

use common::error::AppError;
use tracing::debug;

use super::text_normalization::strip_invalid_markers;

/// Reads the PDF text layer in document order with replacement markers removed.
pub async fn extract_pdf_content(file_path: &Path) -> Result<String, AppError> {
    let pdf_bytes = tokio::fs::read(file_path).await.map_err(|err| {
        AppError::Extraction(format!("Failed to read PDF {}: {err}", file_path.display()))
    })?;

    // pdf-extract can panic on hostile input; a failed join is an extraction failure too.
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf_bytes))
        .await
        .map_err(|err| AppError::Extraction(format!("PDF extraction aborted: {err}")))?
        .map_err(|err| AppError::Extraction(format!("Failed to extract text from PDF: {err}")))?;

    debug!(chars = text.chars().count(), "pdf text layer extracted");

    Ok(strip_invalid_markers(&text))
}
