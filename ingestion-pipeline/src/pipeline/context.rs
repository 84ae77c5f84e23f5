use common::error::AppError;
use tracing::{error, warn};

use crate::utils::{file_text_extraction::DocumentFormat, text_normalization::ExtractedText};

use super::config::IngestionConfig;

pub struct PipelineContext<'a> {
    pub file_name: &'a str,
    pub format: DocumentFormat,
    pub pipeline_config: &'a IngestionConfig,
    pub extracted: Option<ExtractedText>,
    pub hash: Option<String>,
    /// Last stage entered, reported when the pipeline aborts.
    pub stage: &'static str,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        file_name: &'a str,
        format: DocumentFormat,
        pipeline_config: &'a IngestionConfig,
    ) -> Self {
        Self {
            file_name,
            format,
            pipeline_config,
            extracted: None,
            hash: None,
            stage: "ready",
        }
    }

    pub fn extracted(&self) -> Result<&ExtractedText, AppError> {
        self.extracted
            .as_ref()
            .ok_or_else(|| AppError::InternalError("extracted text expected to be available".into()))
    }

    pub fn hash(&self) -> Result<&str, AppError> {
        self.hash
            .as_deref()
            .ok_or_else(|| AppError::InternalError("content hash expected to be available".into()))
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        let hash = self.hash.as_deref().unwrap_or("-");
        if err.is_retryable() {
            error!(
                file_name = %self.file_name,
                hash,
                stage = self.stage,
                error = %err,
                "ingestion pipeline aborted"
            );
        } else {
            warn!(
                file_name = %self.file_name,
                hash,
                stage = self.stage,
                error = %err,
                "ingestion pipeline rejected upload"
            );
        }
        err
    }
}
