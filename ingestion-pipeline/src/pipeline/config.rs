use std::path::PathBuf;

use common::utils::config::AppConfig;

use crate::utils::legacy_conversion::LegacyConverter;

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Directory shared with the enrichment workers; job input files land here.
    pub artifacts_dir: PathBuf,
    pub converter: LegacyConverter,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            artifacts_dir: config.artifacts_path(),
            converter: LegacyConverter::new(
                config.legacy_converter_bin.clone(),
                config.conversion_timeout(),
            ),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}
