use crate::traits::PostStore;
use crate::types::{AggregatorError, Post};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn PostStore>,
}

pub fn router(store: Arc<dyn PostStore>) -> Router {
    Router::new()
        .route("/api/news", get(latest_news))
        .route("/api/news/{limit}", get(latest_news_with_limit))
        .with_state(ApiState { store })
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

async fn latest_news(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = resolve_limit(query.limit.as_deref());
    Ok(Json(state.store.latest(limit).await?))
}

async fn latest_news_with_limit(
    State(state): State<ApiState>,
    Path(limit): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = resolve_limit(Some(&limit));
    Ok(Json(state.store.latest(limit).await?))
}

/// Missing, unparseable, and non-positive values all mean the default.
pub fn resolve_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub struct ApiError(AggregatorError);

impl From<AggregatorError> for ApiError {
    fn from(e: AggregatorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AggregatorError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            e => {
                tracing::error!("Failed to load latest posts: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
