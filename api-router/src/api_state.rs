use std::sync::Arc;

use common::{
    storage::{db::SurrealDbClient, store::ArticleStore},
    utils::config::AppConfig,
};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub store: Arc<dyn ArticleStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub config: AppConfig,
}
