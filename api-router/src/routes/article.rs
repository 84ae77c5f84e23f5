use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use common::error::AppError;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct NewArticleParams {
    // Size is bounded by the router's body limit.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
}

pub async fn create_article(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<NewArticleParams>,
) -> Result<impl IntoResponse, ApiError> {
    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::Validation("uploaded file has no file name".to_string()))?;

    info!(
        file_name = %file_name,
        upload_bytes = input.file.contents.len(),
        "Received article upload"
    );

    let outcome = state
        .pipeline
        .ingest(&input.file.contents, &file_name)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_articles(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let articles = state.store.list_articles().await?;
    Ok(Json(articles))
}
