pub mod docx_extraction;
pub mod file_text_extraction;
pub mod fingerprint;
pub mod legacy_conversion;
pub mod pdf_ingestion;
pub mod text_normalization;
