use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// Progress of one enrichment kind for one article.
#[derive(Debug, Default, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    #[default]
    None,
    Pending,
    Delivered,
}

impl EnrichmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrichmentStatus::None => "none",
            EnrichmentStatus::Pending => "pending",
            EnrichmentStatus::Delivered => "delivered",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub term: String,
    pub definition: String,
}

/// Field-level update applied to an article identified by its content hash.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticlePatch {
    Simplified(String),
    Terms(Vec<Term>),
}

impl ArticlePatch {
    pub fn field_name(&self) -> &'static str {
        match self {
            ArticlePatch::Simplified(_) => "simplified",
            ArticlePatch::Terms(_) => "terms",
        }
    }

    fn status_field(&self) -> &'static str {
        match self {
            ArticlePatch::Simplified(_) => "simplified_status",
            ArticlePatch::Terms(_) => "terms_status",
        }
    }
}

// The record id is the content hash of `original`.
stored_object!(Article, "article", {
    title: String,
    original: String,
    #[serde(default)]
    simplified: Option<String>,
    #[serde(default)]
    terms: Option<Vec<Term>>,
    #[serde(default)]
    simplified_status: EnrichmentStatus,
    #[serde(default)]
    terms_status: EnrichmentStatus
});

impl Article {
    /// Builds a freshly ingested article whose simplification job is about to be published.
    pub fn new(hash: String, title: String, original: String) -> Self {
        let now = Utc::now();
        Self {
            id: hash,
            created_at: now,
            updated_at: now,
            title,
            original,
            simplified: None,
            terms: None,
            simplified_status: EnrichmentStatus::Pending,
            terms_status: EnrichmentStatus::None,
        }
    }

    pub fn hash(&self) -> &str {
        &self.id
    }

    pub async fn find_by_hash(
        hash: &str,
        db: &SurrealDbClient,
    ) -> Result<Option<Article>, AppError> {
        Ok(db.get_item::<Article>(hash).await?)
    }

    /// Sets a single enrichment field and marks it delivered. Replaying the same patch
    /// leaves the record unchanged apart from `updated_at`.
    pub async fn patch_field(
        hash: &str,
        patch: ArticlePatch,
        db: &SurrealDbClient,
    ) -> Result<Article, AppError> {
        let query = format!(
            "UPDATE type::thing($table, $id) SET {field} = $value, {status} = $status, updated_at = time::now() RETURN AFTER",
            field = patch.field_name(),
            status = patch.status_field(),
        );

        let request = db
            .client
            .query(query)
            .bind(("table", Self::table_name()))
            .bind(("id", hash.to_owned()))
            .bind(("status", EnrichmentStatus::Delivered));

        let mut response = match patch {
            ArticlePatch::Simplified(text) => request.bind(("value", text)).await?,
            ArticlePatch::Terms(terms) => request.bind(("value", terms)).await?,
        };

        let updated: Option<Article> = response.take(0)?;
        updated.ok_or_else(|| AppError::NotFound(format!("article with hash {hash}")))
    }
}
