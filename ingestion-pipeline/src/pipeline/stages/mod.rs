use common::{
    broker::{target_file_for, EnrichmentJob, MessageBroker},
    error::AppError,
    storage::{store::ArticleStore, types::article::Article},
};
use state_machines::core::GuardError;
use tracing::{debug, error, info, instrument, warn};

use crate::utils::{file_text_extraction::extract_text_from_file, fingerprint::fingerprint};

use super::{
    context::PipelineContext,
    state::{Deduplicated, Extracted, Fingerprinted, IngestionMachine, Published, Ready, Stored},
};

/// Result of the dedup check and insert.
pub enum Persisted {
    Stored(IngestionMachine<(), Stored>),
    Duplicate(IngestionMachine<(), Deduplicated>),
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name))]
pub async fn extract(
    machine: IngestionMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
    bytes: &[u8],
) -> Result<IngestionMachine<(), Extracted>, AppError> {
    ctx.stage = "extract";

    let upload = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", ctx.format.extension()))
        .tempfile()?;
    tokio::fs::write(upload.path(), bytes).await?;

    let extracted =
        extract_text_from_file(upload.path(), ctx.format, &ctx.pipeline_config.converter).await?;

    if extracted.title.is_empty() {
        warn!(
            file_name = %ctx.file_name,
            upload_bytes = bytes.len(),
            "upload contains no text"
        );
    }
    debug!(
        file_name = %ctx.file_name,
        title = %extracted.title,
        body_chars = extracted.body.chars().count(),
        "ingestion input ready"
    );

    ctx.extracted = Some(extracted);

    machine
        .extract()
        .map_err(|(_, guard)| map_guard_error("extract", &guard))
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name))]
pub async fn fingerprint_content(
    machine: IngestionMachine<(), Extracted>,
    ctx: &mut PipelineContext<'_>,
) -> Result<IngestionMachine<(), Fingerprinted>, AppError> {
    ctx.stage = "fingerprint";

    let hash = fingerprint(&ctx.extracted()?.body);
    debug!(file_name = %ctx.file_name, %hash, "content fingerprinted");
    ctx.hash = Some(hash);

    machine
        .fingerprint()
        .map_err(|(_, guard)| map_guard_error("fingerprint", &guard))
}

/// Skips content already on record, otherwise writes the job input artifact and inserts
/// the article. A failed insert whose record turns out to exist is a lost race with a
/// concurrent identical upload and counts as a duplicate.
#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name))]
pub async fn deduplicate_or_store(
    machine: IngestionMachine<(), Fingerprinted>,
    ctx: &mut PipelineContext<'_>,
    store: &dyn ArticleStore,
) -> Result<Persisted, AppError> {
    ctx.stage = "deduplicate";
    let hash = ctx.hash()?.to_owned();

    if store.find_by_hash(&hash).await?.is_some() {
        info!(file_name = %ctx.file_name, %hash, "content already ingested");
        return machine
            .deduplicate()
            .map(Persisted::Duplicate)
            .map_err(|(_, guard)| map_guard_error("deduplicate", &guard));
    }

    ctx.stage = "store";
    let extracted = ctx.extracted()?.clone();

    let artifacts_dir = &ctx.pipeline_config.artifacts_dir;
    tokio::fs::create_dir_all(artifacts_dir).await?;
    let artifact = artifacts_dir.join(target_file_for(&hash));
    // Same hash means same body, so a racing upload rewrites identical bytes.
    tokio::fs::write(&artifact, extracted.body.as_bytes()).await?;

    let article = Article::new(hash.clone(), extracted.title, extracted.body);
    if let Err(err) = store.insert_article(article).await {
        if store.find_by_hash(&hash).await.ok().flatten().is_some() {
            info!(
                file_name = %ctx.file_name,
                %hash,
                "concurrent upload stored identical content first"
            );
            return machine
                .deduplicate()
                .map(Persisted::Duplicate)
                .map_err(|(_, guard)| map_guard_error("deduplicate", &guard));
        }
        if let Err(remove_err) = tokio::fs::remove_file(&artifact).await {
            warn!(
                %hash,
                artifact = %artifact.display(),
                error = %remove_err,
                "failed to remove artifact of unstored article"
            );
        }
        return Err(err);
    }

    debug!(%hash, artifact = %artifact.display(), "article stored");

    machine
        .store()
        .map(Persisted::Stored)
        .map_err(|(_, guard)| map_guard_error("store", &guard))
}

#[instrument(level = "trace", skip_all, fields(file_name = %ctx.file_name))]
pub async fn publish(
    machine: IngestionMachine<(), Stored>,
    ctx: &mut PipelineContext<'_>,
    broker: &dyn MessageBroker,
) -> Result<IngestionMachine<(), Published>, AppError> {
    ctx.stage = "publish";
    let job = EnrichmentJob::simplify(ctx.hash()?);

    if let Err(err) = broker.publish_job(&job).await {
        error!(
            hash = %job.hash,
            topic = job.kind.topic(),
            error = %err,
            "article stored without a pending enrichment job"
        );
        return Err(err);
    }

    debug!(hash = %job.hash, topic = job.kind.topic(), target_file = %job.target_file, "enrichment job published");

    machine
        .publish()
        .map_err(|(_, guard)| map_guard_error("publish", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid ingestion pipeline transition during {event}: {guard:?}"
    ))
}
