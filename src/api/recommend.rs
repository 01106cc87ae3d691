//! Recommendation endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub text: String,
}

/// POST /api/recommend - Ask the consultant for vehicles matching a query.
///
/// Provider failures produce the fallback text, never an error.
pub async fn recommend_vehicles(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> ApiResult<RecommendResponse> {
    let revision_id = state.sync.revision_id();

    if request.query.trim().is_empty() {
        return error(
            AppError::Validation("Query is required".to_string()),
            revision_id,
        );
    }

    let inventory = state.sync.catalog().await;
    let text = state.recommender.recommend(&request.query, &inventory).await;
    success(RecommendResponse { text }, revision_id)
}
