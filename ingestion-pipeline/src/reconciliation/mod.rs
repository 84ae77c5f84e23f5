use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use common::{
    broker::{
        messages::{decode_delivery, JobStatus, SimplifiedMessage, TermsMessage},
        Delivery, JobKind, MessageBroker, SIMPLIFY_TOPIC, TERMS_TOPIC,
    },
    error::AppError,
    storage::{store::ArticleStore, types::article::ArticlePatch},
};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Empty payload: the retained slot on the topic was cleared.
    Cleared,
    /// A placeholder or in-progress status; nothing was mutated.
    Ignored,
    Patched { hash: String },
}

/// Applies completion deliveries to stored articles. Holds no per-delivery state, so
/// one instance serves concurrent deliveries for any number of articles.
pub struct Reconciler {
    store: Arc<dyn ArticleStore>,
    broker: Arc<dyn MessageBroker>,
    artifacts_dir: PathBuf,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        broker: Arc<dyn MessageBroker>,
        artifacts_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            broker,
            artifacts_dir,
        }
    }

    pub async fn dispatch(&self, delivery: &Delivery) -> Result<ReconcileOutcome, AppError> {
        match JobKind::from_topic(&delivery.topic) {
            Some(JobKind::Simplify) => self.handle_simplified(&delivery.payload).await,
            Some(JobKind::ExtractTerms) => self.handle_terms(&delivery.payload).await,
            None => {
                warn!(topic = %delivery.topic, "delivery on unexpected topic dropped");
                Ok(ReconcileOutcome::Ignored)
            }
        }
    }

    #[instrument(skip_all, fields(topic = SIMPLIFY_TOPIC))]
    pub async fn handle_simplified(&self, payload: &[u8]) -> Result<ReconcileOutcome, AppError> {
        let Some(message) = decode_delivery::<SimplifiedMessage>(SIMPLIFY_TOPIC, payload)? else {
            return Ok(ReconcileOutcome::Cleared);
        };
        if message.status != JobStatus::Done {
            debug!(hash = %message.hash, status = ?message.status, "simplification not done yet");
            return Ok(ReconcileOutcome::Ignored);
        }

        let artifact = self.resolve_artifact(&message.target_file)?;
        let bytes = tokio::fs::read(&artifact).await.map_err(|err| {
            warn!(
                hash = %message.hash,
                artifact = %artifact.display(),
                error = %err,
                "simplified artifact unreadable"
            );
            AppError::Io(err)
        })?;
        let simplified = String::from_utf8_lossy(&bytes).into_owned();

        self.store
            .patch_field(&message.hash, ArticlePatch::Simplified(simplified))
            .await?;
        info!(hash = %message.hash, "simplified text stored");

        self.clear_after_patch(SIMPLIFY_TOPIC, &message.hash).await;
        Ok(ReconcileOutcome::Patched { hash: message.hash })
    }

    #[instrument(skip_all, fields(topic = TERMS_TOPIC))]
    pub async fn handle_terms(&self, payload: &[u8]) -> Result<ReconcileOutcome, AppError> {
        let Some(message) = decode_delivery::<TermsMessage>(TERMS_TOPIC, payload)? else {
            return Ok(ReconcileOutcome::Cleared);
        };
        if message.status != JobStatus::Done {
            debug!(hash = %message.hash, status = ?message.status, "term extraction not done yet");
            return Ok(ReconcileOutcome::Ignored);
        }

        let term_count = message.terms.len();
        self.store
            .patch_field(&message.hash, ArticlePatch::Terms(message.terms))
            .await?;
        info!(hash = %message.hash, term_count, "terms stored");

        self.clear_after_patch(TERMS_TOPIC, &message.hash).await;
        Ok(ReconcileOutcome::Patched { hash: message.hash })
    }

    /// A failed clear only means the completion may be replayed, which the patch tolerates.
    async fn clear_after_patch(&self, topic: &str, hash: &str) {
        if let Err(err) = self.broker.clear_retained(topic).await {
            warn!(topic, %hash, error = %err, "failed to clear retained completion");
        }
    }

    /// Worker file names are resolved inside the artifacts directory only.
    fn resolve_artifact(&self, target_file: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(target_file);
        let confined = !target_file.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !confined {
            return Err(AppError::malformed(
                SIMPLIFY_TOPIC,
                format!("targetFile {target_file:?} escapes the artifacts directory"),
            ));
        }
        Ok(self.artifacts_dir.join(relative))
    }
}
