pub mod handlers;

pub use handlers::*;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;

/// 构建 HTTP 路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/catalog/search", post(search_catalog))
        .route("/api/bom/match", post(match_bom))
        .route("/api/bom/export", post(export_bom))
        .route("/api/bom/cache", delete(clear_cache))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
