//! Synchronization status shared with the frontend.

use serde::{Deserialize, Serialize};

/// Which persistence backend is serving the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendMode {
    Cloud,
    Local,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Cloud => "Cloud",
            BackendMode::Local => "Local",
        }
    }
}

/// Observable state of the inventory synchronization service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub mode: BackendMode,
    pub is_loading: bool,
    /// Incremented every time a new catalog is installed
    pub revision_id: i64,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_warning: Option<String>,
}

impl SyncStatus {
    pub fn initializing(mode: BackendMode) -> Self {
        Self {
            mode,
            is_loading: true,
            revision_id: 0,
            count: 0,
            storage_warning: None,
        }
    }
}
