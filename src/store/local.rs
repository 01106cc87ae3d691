//! Local persistence backend.
//!
//! The whole catalog is stored as one JSON blob under a single key. Reads fail
//! soft to the starter inventory; writes are bounded by a storage quota.

use chrono::Utc;

use super::seed::starter_inventory;
use crate::db::KvStore;
use crate::errors::AppError;
use crate::models::VehicleRecord;

/// Key holding the JSON-serialized catalog array.
pub const INVENTORY_KEY: &str = "carz34_inventory";

/// Warning surfaced to the operator when a save does not fit the quota.
pub const QUOTA_WARNING: &str =
    "Storage limit reached! Please use smaller images or remove some vehicles.";

/// Single-device catalog storage.
#[derive(Clone)]
pub struct LocalBackend {
    kv: KvStore,
    quota_bytes: usize,
}

impl LocalBackend {
    pub fn new(kv: KvStore, quota_bytes: usize) -> Self {
        Self { kv, quota_bytes }
    }

    /// Load the stored catalog.
    ///
    /// A missing, unreadable or non-array blob yields the starter inventory.
    /// A stored empty array is returned as-is.
    pub async fn load_all(&self) -> Vec<VehicleRecord> {
        let raw = match self.kv.get(INVENTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return starter_inventory(),
            Err(e) => {
                tracing::error!("Failed to load inventory from storage: {}", e);
                return starter_inventory();
            }
        };

        match serde_json::from_str::<Vec<VehicleRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Stored inventory is corrupt, using starter inventory: {}", e);
                starter_inventory()
            }
        }
    }

    /// Serialize and store the full catalog.
    ///
    /// Fails with `QuotaExceeded` when the blob is larger than the quota; the
    /// previously stored blob is left untouched in that case.
    pub async fn save_all(&self, records: &[VehicleRecord]) -> Result<(), AppError> {
        let blob = serde_json::to_string(records)
            .map_err(|e| AppError::Internal(format!("Failed to serialize inventory: {}", e)))?;

        if blob.len() > self.quota_bytes {
            tracing::warn!(
                bytes = blob.len(),
                quota = self.quota_bytes,
                "Inventory blob exceeds storage quota"
            );
            return Err(AppError::QuotaExceeded(QUOTA_WARNING.to_string()));
        }

        self.kv.set(INVENTORY_KEY, &blob).await
    }

    /// Generate a session-unique id: base-36 millisecond timestamp followed by
    /// five random base-36 characters.
    pub fn generate_id(&self) -> String {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let random = uuid::Uuid::new_v4().as_u128();
        format!("{}{}", to_base36(millis), suffix_base36(random, 5))
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn suffix_base36(mut value: u128, len: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..len)
        .map(|_| {
            let digit = DIGITS[(value % 36) as usize] as char;
            value /= 36;
            digit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn backend(quota: usize) -> (LocalBackend, KvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("local.sqlite"))
            .await
            .unwrap();
        let kv = KvStore::new(pool);
        (LocalBackend::new(kv.clone(), quota), kv, temp_dir)
    }

    #[tokio::test]
    async fn test_load_without_blob_returns_starter() {
        let (local, _kv, _dir) = backend(1 << 20).await;
        assert_eq!(local.load_all().await, starter_inventory());
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_returns_starter() {
        let (local, kv, _dir) = backend(1 << 20).await;

        kv.set(INVENTORY_KEY, "{not json").await.unwrap();
        assert_eq!(local.load_all().await, starter_inventory());

        kv.set(INVENTORY_KEY, r#"{"id":"1"}"#).await.unwrap();
        assert_eq!(local.load_all().await, starter_inventory());
    }

    #[tokio::test]
    async fn test_empty_array_is_honoured() {
        let (local, _kv, _dir) = backend(1 << 20).await;
        local.save_all(&[]).await.unwrap();
        assert!(local.load_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_load_round_trip_preserves_content() {
        let (local, kv, _dir) = backend(1 << 20).await;

        let loaded = local.load_all().await;
        local.save_all(&loaded).await.unwrap();
        let first: serde_json::Value =
            serde_json::from_str(&kv.get(INVENTORY_KEY).await.unwrap().unwrap()).unwrap();

        local.save_all(&local.load_all().await).await.unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&kv.get(INVENTORY_KEY).await.unwrap().unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(local.load_all().await, loaded);
    }

    #[tokio::test]
    async fn test_quota_exceeded_keeps_previous_blob() {
        let (local, kv, _dir) = backend(64).await;
        kv.set(INVENTORY_KEY, "[]").await.unwrap();

        let err = local.save_all(&starter_inventory()).await.unwrap_err();
        assert_eq!(err, AppError::QuotaExceeded(QUOTA_WARNING.to_string()));
        assert_eq!(kv.get(INVENTORY_KEY).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let (local, _kv, _dir) = backend(1 << 20).await;
        let ids: HashSet<String> = (0..100).map(|_| local.generate_id()).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.len() > 5
            && id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(suffix_base36(0, 3), "000");
    }
}
