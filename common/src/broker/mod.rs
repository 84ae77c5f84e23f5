pub mod messages;
pub mod mqtt;

use async_trait::async_trait;

use crate::error::AppError;

pub const SIMPLIFY_TOPIC: &str = "articles/simplified";
pub const TERMS_TOPIC: &str = "articles/terms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Simplify,
    ExtractTerms,
}

impl JobKind {
    pub fn topic(self) -> &'static str {
        match self {
            JobKind::Simplify => SIMPLIFY_TOPIC,
            JobKind::ExtractTerms => TERMS_TOPIC,
        }
    }

    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            SIMPLIFY_TOPIC => Some(JobKind::Simplify),
            TERMS_TOPIC => Some(JobKind::ExtractTerms),
            _ => None,
        }
    }
}

/// An outstanding request to an external worker. Lives only on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentJob {
    pub hash: String,
    pub kind: JobKind,
    pub target_file: String,
}

impl EnrichmentJob {
    pub fn simplify(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            kind: JobKind::Simplify,
            target_file: target_file_for(hash),
        }
    }
}

/// File name the worker reads its input from and writes its output to.
pub fn target_file_for(hash: &str) -> String {
    format!("{hash}-original.txt")
}

/// Publish/subscribe contract. Retained-state clearing is the broker's own idiom and
/// stays behind `clear_retained`.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish_job(&self, job: &EnrichmentJob) -> Result<(), AppError>;

    async fn clear_retained(&self, topic: &str) -> Result<(), AppError>;
}

/// A raw message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    Delivery(Delivery),
    /// Protocol traffic with nothing to dispatch.
    Idle,
    /// The source is exhausted and will not yield again.
    Closed,
}

#[async_trait]
pub trait DeliverySource: Send {
    async fn next_delivery(&mut self) -> Result<Polled, AppError>;
}
