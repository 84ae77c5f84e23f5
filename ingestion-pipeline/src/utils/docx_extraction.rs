use std::{
    io::{Cursor, Read},
    path::Path,
};

use common::error::AppError;
use quick_xml::{events::Event, Reader};

const DOCUMENT_XML: &str = "word/document.xml";
/// Upper bound on the decompressed main document part.
const MAX_DOCUMENT_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Extracts every run text (`w:t`) of a DOCX file in document order, one per line.
pub async fn extract_docx_content(file_path: &Path) -> Result<String, AppError> {
    let bytes = tokio::fs::read(file_path).await.map_err(|err| {
        AppError::Extraction(format!("Failed to read DOCX {}: {err}", file_path.display()))
    })?;

    tokio::task::spawn_blocking(move || extract_docx_from_mem(&bytes))
        .await
        .map_err(|err| AppError::Extraction(format!("DOCX extraction aborted: {err}")))?
}

pub fn extract_docx_from_mem(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| AppError::Extraction(format!("Invalid DOCX archive: {err}")))?;

    let entry = archive
        .by_name(DOCUMENT_XML)
        .map_err(|err| AppError::Extraction(format!("{DOCUMENT_XML} not readable: {err}")))?;

    let xml = read_bounded(entry, MAX_DOCUMENT_XML_BYTES)?;

    collect_run_text(&xml)
}

fn read_bounded(reader: impl Read, limit: u64) -> Result<Vec<u8>, AppError> {
    let mut xml = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut xml)
        .map_err(|err| AppError::Extraction(format!("Failed to inflate {DOCUMENT_XML}: {err}")))?;
    if xml.len() as u64 > limit {
        return Err(AppError::Extraction(format!(
            "{DOCUMENT_XML} exceeds size limit ({limit} bytes)"
        )));
    }
    Ok(xml)
}

/// Only WordprocessingML runs count; DrawingML `a:t` and math `m:t` text is skipped.
fn is_run_text(name: &[u8]) -> bool {
    name == b"w:t"
}

fn collect_run_text(xml: &[u8]) -> Result<String, AppError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut runs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if is_run_text(e.name().as_ref()) => {
                current = Some(String::new());
            }
            Ok(Event::Text(text)) => {
                if let Some(run) = current.as_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|err| AppError::Extraction(format!("Bad DOCX text: {err}")))?;
                    run.push_str(&unescaped);
                }
            }
            Ok(Event::End(e)) if is_run_text(e.name().as_ref()) => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(AppError::Extraction(format!(
                    "Malformed {DOCUMENT_XML}: {err}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(runs.join("\n"))
}
