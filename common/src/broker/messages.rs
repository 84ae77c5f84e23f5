use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{error::AppError, storage::types::article::Term};

use super::{EnrichmentJob, JobKind};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Done,
    /// Any status string this service does not act on.
    #[serde(other)]
    Unknown,
}

/// Payload on `articles/simplified`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedMessage {
    pub hash: String,
    pub target_file: String,
    pub status: JobStatus,
}

/// Payload on `articles/terms`. Terms travel inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermsMessage {
    pub hash: String,
    #[serde(default)]
    pub terms: Vec<Term>,
    pub status: JobStatus,
}

/// Serializes the `status: "new"` message announcing a job on its topic.
pub fn encode_job(job: &EnrichmentJob) -> Result<Vec<u8>, AppError> {
    let encoded = match job.kind {
        JobKind::Simplify => serde_json::to_vec(&SimplifiedMessage {
            hash: job.hash.clone(),
            target_file: job.target_file.clone(),
            status: JobStatus::New,
        }),
        JobKind::ExtractTerms => serde_json::to_vec(&TermsMessage {
            hash: job.hash.clone(),
            terms: Vec::new(),
            status: JobStatus::New,
        }),
    };

    encoded.map_err(|e| AppError::Broker(format!("Serialization Error: {e}")))
}

/// Decodes a delivery. An empty payload is the cleared-retained signal and yields `None`.
pub fn decode_delivery<T>(topic: &str, payload: &[u8]) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned,
{
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(payload)
        .map(Some)
        .map_err(|e| AppError::malformed(topic, e.to_string()))
}
