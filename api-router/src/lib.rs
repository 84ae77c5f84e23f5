use std::path::Path;

use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use routes::{
    article::{create_article, list_articles},
    liveness::live,
    readiness::ready,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
};

pub mod api_state;
pub mod error;
mod routes;

/// Article upload and listing plus probes.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let articles = Router::new()
        .route(
            "/article/new",
            post(create_article).layer(DefaultBodyLimit::max(app_state.config.upload_max_bytes)),
        )
        .route("/articles", get(list_articles));

    probes.merge(articles)
}

/// Browser frontends on any origin may call the API with credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Complete application: API routes, CORS and, when configured, the static frontend
/// with `index.html` served for unknown paths.
pub fn app_router(app_state: ApiState) -> Router {
    let mut router = Router::new().merge(api_routes(&app_state));

    if let Some(frontend_dir) = app_state.config.frontend_dir.as_deref() {
        let index = Path::new(frontend_dir).join("index.html");
        router = router.fallback_service(ServeDir::new(frontend_dir).fallback(ServeFile::new(index)));
    }

    router.layer(cors_layer()).with_state(app_state)
}
