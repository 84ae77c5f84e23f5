use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use common::error::AppError;
use tokio::process::Command;
use tracing::{debug, warn};

/// Converts legacy binary word-processor files to DOCX by shelling out to an office
/// suite running headless (`soffice --headless --convert-to docx --outdir <dir> <file>`).
#[derive(Debug, Clone)]
pub struct LegacyConverter {
    binary: String,
    timeout: Duration,
}

impl LegacyConverter {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Returns the path of the produced `<stem>.docx` inside `out_dir`.
    pub async fn convert_legacy_to_modern(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, AppError> {
        let stem = input
            .file_stem()
            .ok_or_else(|| {
                AppError::Conversion(format!("Input has no file name: {}", input.display()))
            })?
            .to_string_lossy()
            .into_owned();

        let child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AppError::Conversion(format!("Failed to launch {}: {err}", self.binary))
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(binary = %self.binary, timeout_secs = self.timeout.as_secs(), "legacy conversion timed out");
                AppError::Conversion(format!(
                    "{} did not finish within {}s",
                    self.binary,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| AppError::Conversion(format!("{} failed: {err}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Conversion(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let converted = out_dir.join(format!("{stem}.docx"));
        if !tokio::fs::try_exists(&converted).await.unwrap_or(false) {
            return Err(AppError::Conversion(format!(
                "Converter produced no output at {}",
                converted.display()
            )));
        }

        debug!(output = %converted.display(), "legacy document converted");
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_binary_is_conversion_error() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("report.doc");
        tokio::fs::write(&input, b"legacy").await.expect("write");

        let converter =
            LegacyConverter::new("definitely-not-an-office-suite-binary", Duration::from_secs(5));
        let result = converter.convert_legacy_to_modern(&input, dir.path()).await;

        assert!(matches!(result, Err(AppError::Conversion(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_exit_without_output_is_conversion_error() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("report.doc");
        tokio::fs::write(&input, b"legacy").await.expect("write");

        // `true` ignores its arguments and exits 0 without writing anything.
        let converter = LegacyConverter::new("true", Duration::from_secs(5));
        let result = converter.convert_legacy_to_modern(&input, dir.path()).await;

        assert!(matches!(result, Err(AppError::Conversion(msg)) if msg.contains("report.docx")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_conversion_error() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("report.doc");
        tokio::fs::write(&input, b"legacy").await.expect("write");

        let converter = LegacyConverter::new("false", Duration::from_secs(5));
        let result = converter.convert_legacy_to_modern(&input, dir.path()).await;

        assert!(matches!(result, Err(AppError::Conversion(_))));
    }
}
