use std::path::Path;

use common::error::AppError;
use tracing::debug;

use super::{
    docx_extraction::extract_docx_content,
    legacy_conversion::LegacyConverter,
    pdf_ingestion::extract_pdf_content,
    text_normalization::{normalize_text, strip_invalid_markers, ExtractedText},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Pdf,
    Doc,
    Docx,
}

impl DocumentFormat {
    /// Case-insensitive; a leading dot is accepted.
    pub fn from_extension(extension: &str) -> Result<Self, AppError> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "txt" => Ok(Self::Txt),
            "pdf" => Ok(Self::Pdf),
            "doc" => Ok(Self::Doc),
            "docx" => Ok(Self::Docx),
            _ => Err(AppError::UnsupportedFormat(extension.to_string())),
        }
    }

    pub fn from_file_name(file_name: &str) -> Result<Self, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| AppError::UnsupportedFormat(file_name.to_string()))?;
        Self::from_extension(extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
        }
    }
}

/// Extracts and normalizes the text of a stored upload.
pub async fn extract_text_from_file(
    path: &Path,
    format: DocumentFormat,
    converter: &LegacyConverter,
) -> Result<ExtractedText, AppError> {
    let raw = match format {
        DocumentFormat::Txt => {
            let bytes = tokio::fs::read(path).await.map_err(|err| {
                AppError::Extraction(format!("Failed to read {}: {err}", path.display()))
            })?;
            strip_invalid_markers(&String::from_utf8_lossy(&bytes))
        }
        DocumentFormat::Pdf => extract_pdf_content(path).await?,
        DocumentFormat::Docx => strip_invalid_markers(&extract_docx_content(path).await?),
        DocumentFormat::Doc => {
            let scratch = tempfile::tempdir()?;
            let converted = converter
                .convert_legacy_to_modern(path, scratch.path())
                .await?;
            strip_invalid_markers(&extract_docx_content(&converted).await?)
        }
    };

    let extracted = normalize_text(&raw);
    debug!(
        format = format.extension(),
        title_chars = extracted.title.chars().count(),
        body_chars = extracted.body.chars().count(),
        "document text extracted"
    );
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::docx_extraction::tests::docx_bytes;
    use std::{io::Write, time::Duration};
    use tempfile::NamedTempFile;

    fn converter() -> LegacyConverter {
        LegacyConverter::new("definitely-not-an-office-suite-binary", Duration::from_secs(1))
    }

    fn temp_with(bytes: &[u8], suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(bytes).expect("write");
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("txt").ok(), Some(DocumentFormat::Txt));
        assert_eq!(DocumentFormat::from_extension(".PDF").ok(), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("Doc").ok(), Some(DocumentFormat::Doc));
        assert_eq!(DocumentFormat::from_extension("docx").ok(), Some(DocumentFormat::Docx));
        assert!(matches!(
            DocumentFormat::from_extension("png"),
            Err(AppError::UnsupportedFormat(ext)) if ext == "png"
        ));
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(
            DocumentFormat::from_file_name("Report.Final.DOCX").ok(),
            Some(DocumentFormat::Docx)
        );
        assert!(matches!(
            DocumentFormat::from_file_name("README"),
            Err(AppError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_txt_is_normalized() {
        let file = temp_with(b"\xEF\xBB\xBF  My Title \r\n\r\nBody line A\nBody line B\n", ".txt");

        let extracted = extract_text_from_file(file.path(), DocumentFormat::Txt, &converter())
            .await
            .expect("extract");

        assert_eq!(extracted.title, "My Title");
        assert_eq!(extracted.body, "Body line A\nBody line B");
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_dropped_not_fatal() {
        let file = temp_with(b"Title\nBody \xFF\xFEtext", ".txt");

        let extracted = extract_text_from_file(file.path(), DocumentFormat::Txt, &converter())
            .await
            .expect("extract");

        assert_eq!(extracted.body, "Body text");
    }

    #[tokio::test]
    async fn test_docx_matches_equivalent_txt() {
        let docx = temp_with(
            &docx_bytes(&[&["My Title"], &["Body line A"], &["Body line B"]]),
            ".docx",
        );
        let txt = temp_with(b"My Title\n\n  Body line A\nBody line B  \n", ".txt");

        let from_docx = extract_text_from_file(docx.path(), DocumentFormat::Docx, &converter())
            .await
            .expect("docx");
        let from_txt = extract_text_from_file(txt.path(), DocumentFormat::Txt, &converter())
            .await
            .expect("txt");

        assert_eq!(from_docx, from_txt);
    }

    #[tokio::test]
    async fn test_doc_without_converter_is_conversion_error() {
        let file = temp_with(b"\xD0\xCF\x11\xE0legacy", ".doc");

        let result = extract_text_from_file(file.path(), DocumentFormat::Doc, &converter()).await;

        assert!(matches!(result, Err(AppError::Conversion(_))));
    }
}
