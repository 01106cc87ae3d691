//! Admin gate and console endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::catalog;
use crate::errors::AppError;
use crate::models::VehicleRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub passcode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub q: Option<String>,
}

/// POST /api/admin/login - Open the admin gate.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<AdminStatus> {
    let revision_id = state.sync.revision_id();

    match state.gate.login(&request.passcode).await {
        Ok(true) => success(AdminStatus { is_admin: true }, revision_id),
        Ok(false) => error(
            AppError::Unauthorized("Invalid passcode".to_string()),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/logout - Close the admin gate.
pub async fn admin_logout(State(state): State<AppState>) -> ApiResult<AdminStatus> {
    let revision_id = state.sync.revision_id();

    match state.gate.logout().await {
        Ok(()) => success(AdminStatus { is_admin: false }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/status - Whether the gate is open.
pub async fn admin_status(State(state): State<AppState>) -> ApiResult<AdminStatus> {
    let revision_id = state.sync.revision_id();
    let is_admin = state.gate.is_admin().await;
    success(AdminStatus { is_admin }, revision_id)
}

/// GET /api/admin/vehicles - Console listing with brand/model search.
pub async fn admin_list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> ApiResult<Vec<VehicleRecord>> {
    let revision_id = state.sync.revision_id();
    let records = state.sync.catalog().await;
    success(
        catalog::admin_filter(&records, query.q.as_deref()),
        revision_id,
    )
}
