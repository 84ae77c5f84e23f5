use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::error::AppError;

use super::{
    db::SurrealDbClient,
    types::article::{Article, ArticlePatch},
};

/// Narrow record contract the ingestion and reconciliation paths depend on.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, article: Article) -> Result<(), AppError>;

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Article>, AppError>;

    async fn patch_field(&self, hash: &str, patch: ArticlePatch) -> Result<(), AppError>;

    async fn list_articles(&self) -> Result<Vec<Article>, AppError>;
}

/// SurrealDB-backed store. Every call is bounded by `op_timeout`.
#[derive(Clone)]
pub struct SurrealArticleStore {
    db: Arc<SurrealDbClient>,
    op_timeout: Duration,
}

impl SurrealArticleStore {
    pub fn new(db: Arc<SurrealDbClient>, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }

    pub fn db(&self) -> &Arc<SurrealDbClient> {
        &self.db
    }

    async fn with_deadline<T, F>(&self, operation: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>> + Send,
    {
        timeout(self.op_timeout, fut).await.map_err(|_| {
            AppError::Store(format!(
                "{operation} exceeded deadline of {}ms",
                self.op_timeout.as_millis()
            ))
        })?
    }
}

#[async_trait]
impl ArticleStore for SurrealArticleStore {
    async fn insert_article(&self, article: Article) -> Result<(), AppError> {
        let hash = article.hash().to_owned();
        let stored = self
            .with_deadline("insert", async {
                Ok(self.db.store_item(article).await?)
            })
            .await?;

        stored
            .map(|_| ())
            .ok_or_else(|| AppError::Store(format!("insert of {hash} returned no record")))
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Article>, AppError> {
        self.with_deadline("find_by_hash", Article::find_by_hash(hash, &self.db))
            .await
    }

    async fn patch_field(&self, hash: &str, patch: ArticlePatch) -> Result<(), AppError> {
        self.with_deadline("patch_field", Article::patch_field(hash, patch, &self.db))
            .await
            .map(|_| ())
    }

    async fn list_articles(&self) -> Result<Vec<Article>, AppError> {
        self.with_deadline("list_articles", async {
            Ok(self.db.get_all_stored_items::<Article>().await?)
        })
        .await
    }
}
