//! Synchronization status endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::SyncStatus;
use crate::AppState;

/// GET /api/sync - Backend mode, loading flag and catalog revision.
pub async fn get_sync_status(State(state): State<AppState>) -> ApiResult<SyncStatus> {
    let status = state.sync.status();
    let revision_id = status.revision_id;
    success(status, revision_id)
}
