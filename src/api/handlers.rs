use crate::error::MatcherError;
use crate::export;
use crate::models::{BomLine, MatchResult, QueryResult};
use crate::service::{BomItemMatcher, CatalogProvider, CatalogQuery, MatchType};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogProvider>,
    pub matcher: Arc<BomItemMatcher>,
}

/// 请求体: 目录搜索
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_page")]
    pub page: usize,
    pub page_size: Option<usize>,
    #[serde(default)]
    pub match_type: MatchType,
}

/// 请求体: BOM 行列表
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub lines: Vec<BomLine>,
    pub max_alternatives: Option<usize>,
}

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn default_page() -> usize {
    1
}

fn error_response(status: StatusCode, message: String) -> Response {
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        message,
        data: None,
    };
    (status, Json(response)).into_response()
}

fn status_for(err: &MatcherError) -> StatusCode {
    match err {
        MatcherError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 目录搜索接口 (无关键词即按批量价浏览)
pub async fn search_catalog(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Response {
    let page_size = req
        .page_size
        .unwrap_or_else(|| state.matcher.config().page_size);
    let query = CatalogQuery::from_keyword(&req.keyword, req.page, page_size)
        .with_match_type(req.match_type);

    let catalog = Arc::clone(&state.catalog);
    let joined = tokio::task::spawn_blocking(move || catalog.find(&query)).await;

    match joined {
        Ok(Ok(result)) => {
            let response: ApiResponse<QueryResult> = ApiResponse {
                success: true,
                message: format!("Found {} products", result.total),
                data: Some(result),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(e)) => error_response(status_for(&e), format!("Error: {}", e)),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

async fn run_batch(state: &AppState, req: MatchRequest) -> Result<Vec<MatchResult>, String> {
    let matcher = Arc::clone(&state.matcher);
    tokio::task::spawn_blocking(move || match req.max_alternatives {
        Some(k) => req.lines.iter().map(|line| matcher.match_line(line, k)).collect(),
        None => matcher.batch_match(&req.lines, None::<fn(usize, usize, &str)>),
    })
    .await
    .map_err(|e| e.to_string())
}

/// BOM 批量匹配接口
pub async fn match_bom(State(state): State<AppState>, Json(req): Json<MatchRequest>) -> Response {
    let total = req.lines.len();
    match run_batch(&state, req).await {
        Ok(results) => {
            let matched = results.iter().filter(|r| r.is_matched()).count();
            let errors = results.iter().filter(|r| r.is_error()).count();
            let response = ApiResponse {
                success: true,
                message: format!(
                    "Matched {} of {} lines, {} errors",
                    matched, total, errors
                ),
                data: Some(results),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

/// BOM 匹配并导出 CSV
pub async fn export_bom(State(state): State<AppState>, Json(req): Json<MatchRequest>) -> Response {
    let results = match run_batch(&state, req).await {
        Ok(results) => results,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    };

    let mut buf = Vec::new();
    match export::write_results(&mut buf, &results) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buf,
        )
            .into_response(),
        Err(e) => error_response(status_for(&e), format!("Error: {}", e)),
    }
}

/// 清空匹配缓存
pub async fn clear_cache(State(state): State<AppState>) -> Response {
    state.matcher.clear_cache();
    let response: ApiResponse<()> = ApiResponse {
        success: true,
        message: "Match cache cleared".to_string(),
        data: None,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use crate::models::CatalogRecord;
    use crate::service::CatalogSnapshot;

    fn state() -> AppState {
        let mut r = CatalogRecord::new("C1", "LM358");
        r.description = "LM358 dual op amp".into();
        let catalog = Arc::new(CatalogSnapshot::new(vec![r]).unwrap());
        let matcher = Arc::new(BomItemMatcher::new(catalog.clone(), MatcherConfig::default()));
        AppState { catalog, matcher }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_search_zero_page_is_bad_request() {
        let req = SearchRequest {
            keyword: "lm358".into(),
            page: 0,
            page_size: None,
            match_type: MatchType::Fuzzy,
        };
        let response = search_catalog(State(state()), Json(req)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_match_bom_returns_results() {
        let req = MatchRequest {
            lines: vec![BomLine::new("LM358")],
            max_alternatives: None,
        };
        let response = match_bom(State(state()), Json(req)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["method"], "exact");
        assert_eq!(body["data"][0]["selected"]["code"], "C1");
    }

    #[tokio::test]
    async fn test_export_is_csv() {
        let req = MatchRequest {
            lines: vec![BomLine::new("LM358").with_quantity(2)],
            max_alternatives: Some(3),
        };
        let response = export_bom(State(state()), Json(req)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Line,Quantity"));
        assert!(text.contains("LM358,2,,C1"));
    }
}
