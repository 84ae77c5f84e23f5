#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod pipeline;
pub mod reconciliation;
pub mod utils;

use common::{
    broker::{DeliverySource, Polled},
    error::AppError,
};
pub use pipeline::{IngestionConfig, IngestionOutcome, IngestionPipeline};
pub use reconciliation::{ReconcileOutcome, Reconciler};
use std::sync::Arc;
use tokio::{
    task::JoinSet,
    time::{sleep, Duration},
};
use tracing::{debug, error, info, warn};

/// Pulls deliveries from the broker and runs each through the reconciler on its own
/// task, so slow store writes for one article never hold up another. Handler failures
/// are logged and dropped; the retained message is the retry. Returns once the source
/// closes and every in-flight delivery has finished.
pub async fn run_subscriber_loop<S>(
    mut source: S,
    reconciler: Arc<Reconciler>,
) -> Result<(), AppError>
where
    S: DeliverySource,
{
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        while let Some(joined) = in_flight.try_join_next() {
            if let Err(err) = joined {
                error!(error = %err, "reconciliation task panicked");
            }
        }

        match source.next_delivery().await {
            Ok(Polled::Delivery(delivery)) => {
                let reconciler = Arc::clone(&reconciler);
                in_flight.spawn(async move {
                    match reconciler.dispatch(&delivery).await {
                        Ok(outcome) => {
                            debug!(topic = %delivery.topic, ?outcome, "delivery reconciled");
                        }
                        Err(err @ AppError::MalformedPayload { .. }) => {
                            warn!(topic = %delivery.topic, error = %err, "malformed delivery dropped");
                        }
                        Err(err) => {
                            error!(topic = %delivery.topic, error = %err, "reconciliation failed");
                        }
                    }
                });
            }
            Ok(Polled::Idle) => {}
            Ok(Polled::Closed) => {
                info!(in_flight = in_flight.len(), "delivery source closed, draining");
                while let Some(joined) = in_flight.join_next().await {
                    if let Err(err) = joined {
                        error!(error = %err, "reconciliation task panicked");
                    }
                }
                return Ok(());
            }
            Err(err) => {
                error!(error = %err, "failed to poll broker");
                warn!("Backing off for 1s after broker error");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{
        broker::{Delivery, EnrichmentJob, MessageBroker, SIMPLIFY_TOPIC, TERMS_TOPIC},
        storage::{
            db::SurrealDbClient,
            store::{ArticleStore, SurrealArticleStore},
            types::article::Article,
        },
    };
    use std::collections::VecDeque;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct ScriptedSource {
        script: VecDeque<Result<Polled, AppError>>,
    }

    #[async_trait]
    impl DeliverySource for ScriptedSource {
        async fn next_delivery(&mut self) -> Result<Polled, AppError> {
            self.script.pop_front().unwrap_or(Ok(Polled::Closed))
        }
    }

    #[derive(Default)]
    struct RecordingBroker {
        published: Mutex<Vec<EnrichmentJob>>,
        cleared: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageBroker for RecordingBroker {
        async fn publish_job(&self, job: &EnrichmentJob) -> Result<(), AppError> {
            self.published.lock().await.push(job.clone());
            Ok(())
        }

        async fn clear_retained(&self, topic: &str) -> Result<(), AppError> {
            self.cleared.lock().await.push(topic.to_owned());
            Ok(())
        }
    }

    fn delivery(topic: &str, payload: &str) -> Result<Polled, AppError> {
        Ok(Polled::Delivery(Delivery {
            topic: topic.into(),
            payload: payload.as_bytes().to_vec(),
        }))
    }

    #[tokio::test]
    async fn test_loop_survives_bad_deliveries_and_drains() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store = Arc::new(SurrealArticleStore::new(
            Arc::new(db),
            Duration::from_secs(5),
        ));
        store
            .insert_article(Article::new("h1".into(), "Title".into(), "Body".into()))
            .await
            .expect("seed");
        let broker = Arc::new(RecordingBroker::default());
        let artifacts = tempfile::tempdir().expect("artifacts dir");
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store) as Arc<dyn ArticleStore>,
            Arc::clone(&broker) as Arc<dyn MessageBroker>,
            artifacts.path().to_path_buf(),
        ));

        let source = ScriptedSource {
            script: VecDeque::from(vec![
                delivery(TERMS_TOPIC, "{garbage"),
                Ok(Polled::Idle),
                Err(AppError::Broker("Connection lost: reset".into())),
                delivery(SIMPLIFY_TOPIC, r#"{"hash":"h1","targetFile":"h1-original.txt","status":"new"}"#),
                delivery(
                    TERMS_TOPIC,
                    r#"{"hash":"h1","terms":[{"term":"Ion","definition":"Charged atom"}],"status":"done"}"#,
                ),
            ]),
        };

        run_subscriber_loop(source, reconciler)
            .await
            .expect("loop ends cleanly");

        let article = store.find_by_hash("h1").await.expect("find").expect("exists");
        assert_eq!(article.terms.map(|terms| terms.len()), Some(1));
        assert!(article.simplified.is_none());
        assert_eq!(*broker.cleared.lock().await, vec![TERMS_TOPIC.to_string()]);
    }

    #[tokio::test]
    async fn test_upload_then_simplification_round_trip() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb");
        let store: Arc<dyn ArticleStore> = Arc::new(SurrealArticleStore::new(
            Arc::new(db),
            Duration::from_secs(5),
        ));
        let broker = Arc::new(RecordingBroker::default());
        let artifacts = tempfile::tempdir().expect("artifacts dir");

        let pipeline = IngestionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&broker) as Arc<dyn MessageBroker>,
            IngestionConfig {
                artifacts_dir: artifacts.path().to_path_buf(),
                ..IngestionConfig::default()
            },
        );
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&broker) as Arc<dyn MessageBroker>,
            artifacts.path().to_path_buf(),
        );

        let outcome = pipeline
            .ingest(b"Sample Title\n\nOriginal A\nOriginal B\n", "sample.txt")
            .await
            .expect("ingest");
        assert!(matches!(outcome, IngestionOutcome::Created { .. }));
        let hash = outcome.hash().to_owned();

        let job = broker.published.lock().await.first().cloned().expect("job published");
        assert_eq!(job.hash, hash);
        assert_eq!(job.target_file, format!("{hash}-original.txt"));

        // The worker overwrites its input file with the simplified text.
        tokio::fs::write(
            artifacts.path().join(&job.target_file),
            "Simplified A\nSimplified B",
        )
        .await
        .expect("worker output");

        let done = Delivery {
            topic: SIMPLIFY_TOPIC.into(),
            payload: format!(
                r#"{{"hash":"{hash}","targetFile":"{}","status":"done"}}"#,
                job.target_file
            )
            .into_bytes(),
        };
        let reconciled = reconciler.dispatch(&done).await.expect("dispatch");

        assert_eq!(reconciled, ReconcileOutcome::Patched { hash: hash.clone() });
        let article = store.find_by_hash(&hash).await.expect("find").expect("exists");
        assert_eq!(article.title, "Sample Title");
        assert_eq!(article.original, "Original A\nOriginal B");
        assert_eq!(article.simplified.as_deref(), Some("Simplified A\nSimplified B"));
        assert_eq!(*broker.cleared.lock().await, vec![SIMPLIFY_TOPIC.to_string()]);
    }
}
