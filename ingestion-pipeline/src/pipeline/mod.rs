mod config;
mod context;
mod stages;
mod state;

pub use config::IngestionConfig;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{broker::MessageBroker, error::AppError, storage::store::ArticleStore};
use serde::Serialize;
use tracing::info;

use crate::utils::file_text_extraction::DocumentFormat;

use self::{
    context::PipelineContext,
    stages::{deduplicate_or_store, extract, fingerprint_content, publish, Persisted},
    state::ready,
};

/// What an upload amounted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestionOutcome {
    Created { hash: String, title: String },
    #[serde(rename = "exists")]
    AlreadyExists { hash: String },
}

impl IngestionOutcome {
    pub fn hash(&self) -> &str {
        match self {
            IngestionOutcome::Created { hash, .. } | IngestionOutcome::AlreadyExists { hash } => {
                hash
            }
        }
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    store: Arc<dyn ArticleStore>,
    broker: Arc<dyn MessageBroker>,
    pipeline_config: IngestionConfig,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        broker: Arc<dyn MessageBroker>,
        pipeline_config: IngestionConfig,
    ) -> Self {
        Self {
            store,
            broker,
            pipeline_config,
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Extracts, fingerprints and records an upload. New content gets exactly one
    /// simplification job; content already on record gets none.
    #[tracing::instrument(skip_all, fields(file_name = %file_name, upload_bytes = bytes.len()))]
    pub async fn ingest(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<IngestionOutcome, AppError> {
        let format = DocumentFormat::from_file_name(file_name)?;
        let mut ctx = PipelineContext::new(file_name, format, &self.pipeline_config);

        let pipeline_started = Instant::now();
        let machine = ready();

        let machine = extract(machine, &mut ctx, bytes)
            .await
            .map_err(|err| ctx.abort(err))?;
        let machine = fingerprint_content(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;

        let machine = match deduplicate_or_store(machine, &mut ctx, self.store.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?
        {
            Persisted::Duplicate(_machine) => {
                let hash = ctx.hash()?.to_owned();
                info!(
                    %hash,
                    total_ms = Self::duration_millis(pipeline_started.elapsed()),
                    "ingestion finished, duplicate"
                );
                return Ok(IngestionOutcome::AlreadyExists { hash });
            }
            Persisted::Stored(machine) => machine,
        };

        let _machine = publish(machine, &mut ctx, self.broker.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?;

        let hash = ctx.hash()?.to_owned();
        let title = ctx.extracted()?.title.clone();
        info!(
            %hash,
            format = format.extension(),
            total_ms = Self::duration_millis(pipeline_started.elapsed()),
            "ingestion finished, created"
        );

        Ok(IngestionOutcome::Created { hash, title })
    }
}
