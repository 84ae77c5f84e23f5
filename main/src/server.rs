use std::{sync::Arc, time::Duration};

use api_router::{api_state::ApiState, app_router};
use common::{
    broker::{mqtt::MqttBroker, MessageBroker},
    storage::{
        db::SurrealDbClient,
        store::{ArticleStore, SurrealArticleStore},
    },
    utils::config::{get_config, AppConfig},
};
use ingestion_pipeline::{run_subscriber_loop, IngestionConfig, IngestionPipeline, Reconciler};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let db = Arc::new(
        tokio::time::timeout(
            DB_CONNECT_TIMEOUT,
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            ),
        )
        .await??,
    );

    // Ensure db is initialized
    db.ensure_initialized().await?;

    tokio::fs::create_dir_all(config.artifacts_path()).await?;

    let (broker, deliveries) = MqttBroker::connect(&config).await?;

    let (api_state, reconciler) = build_services(&config, db, Arc::new(broker));

    let subscriber = tokio::spawn(async move {
        if let Err(e) = run_subscriber_loop(deliveries, reconciler).await {
            error!("Subscriber loop error: {}", e);
        }
    });

    let app = app_router(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }

    subscriber.abort();
    Ok(())
}

/// Wires the process-wide store and broker into the HTTP state and the reconciler.
fn build_services(
    config: &AppConfig,
    db: Arc<SurrealDbClient>,
    broker: Arc<dyn MessageBroker>,
) -> (ApiState, Arc<Reconciler>) {
    let store: Arc<dyn ArticleStore> = Arc::new(SurrealArticleStore::new(
        Arc::clone(&db),
        config.store_timeout(),
    ));

    let pipeline = Arc::new(IngestionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&broker),
        IngestionConfig::from_app_config(config),
    ));

    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&store),
        broker,
        config.artifacts_path(),
    ));

    let api_state = ApiState {
        db,
        store,
        pipeline,
        config: config.clone(),
    };

    (api_state, reconciler)
}
