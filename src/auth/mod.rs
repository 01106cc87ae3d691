//! Admin access gate.
//!
//! A single durable flag that unlocks the inventory management surface. The
//! flag is global to the deployment: it toggles visibility of the admin
//! routes and is not a per-user session.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::db::KvStore;
use crate::errors::{codes, AppError, ErrorDetails, ErrorResponse};

/// Key holding the admin flag.
pub const ADMIN_KEY: &str = "carz34_admin";

const ADMIN_FLAG: &str = "true";

pub struct AccessGate {
    kv: KvStore,
    passcode: String,
}

impl AccessGate {
    pub fn new(kv: KvStore, passcode: impl Into<String>) -> Self {
        Self {
            kv,
            passcode: passcode.into(),
        }
    }

    /// Open the gate if the passcode matches. Returns whether it opened.
    pub async fn login(&self, passcode: &str) -> Result<bool, AppError> {
        if !constant_time_compare(passcode, &self.passcode) {
            tracing::warn!("Admin login rejected");
            return Ok(false);
        }
        self.kv.set(ADMIN_KEY, ADMIN_FLAG).await?;
        tracing::info!("Admin gate opened");
        Ok(true)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.kv.remove(ADMIN_KEY).await?;
        tracing::info!("Admin gate closed");
        Ok(())
    }

    /// Whether the gate is open. Unreadable storage counts as closed.
    pub async fn is_admin(&self) -> bool {
        match self.kv.get(ADMIN_KEY).await {
            Ok(value) => value.as_deref() == Some(ADMIN_FLAG),
            Err(e) => {
                tracing::error!("Failed to read admin flag: {}", e);
                false
            }
        }
    }
}

/// Middleware rejecting requests while the admin gate is closed.
pub async fn admin_gate_layer(gate: Arc<AccessGate>, request: Request, next: Next) -> Response {
    if gate.is_admin().await {
        next.run(request).await
    } else {
        forbidden_response("Admin access required")
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn forbidden_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::FORBIDDEN.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::FORBIDDEN, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn gate() -> (AccessGate, KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("auth.sqlite"))
            .await
            .unwrap();
        let kv = KvStore::new(pool);
        (AccessGate::new(kv.clone(), "admin34"), kv, temp_dir)
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("admin34", "admin34"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("admin34", "admin35"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("admin", "admin34"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "admin34"));
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let (gate, kv, _dir) = gate().await;
        assert!(!gate.is_admin().await);

        assert!(!gate.login("wrong").await.unwrap());
        assert!(!gate.is_admin().await);

        assert!(gate.login("admin34").await.unwrap());
        assert!(gate.is_admin().await);
        assert_eq!(kv.get(ADMIN_KEY).await.unwrap().as_deref(), Some("true"));

        gate.logout().await.unwrap();
        assert!(!gate.is_admin().await);
        assert_eq!(kv.get(ADMIN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flag_survives_new_gate_instance() {
        let (gate, kv, _dir) = gate().await;
        gate.login("admin34").await.unwrap();

        let reopened = AccessGate::new(kv, "admin34");
        assert!(reopened.is_admin().await);
    }

    #[tokio::test]
    async fn test_only_exact_flag_value_opens_gate() {
        let (gate, kv, _dir) = gate().await;
        kv.set(ADMIN_KEY, "yes").await.unwrap();
        assert!(!gate.is_admin().await);
    }
}
