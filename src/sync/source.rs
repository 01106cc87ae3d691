//! Write routing for the active backend.
//!
//! The service holds exactly one source, chosen at startup and replaced only
//! by the one-way fallback from cloud to local.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{BackendMode, NewVehicle, VehiclePatch, VehicleRecord};
use crate::store::{DocumentStore, LocalBackend};

/// What a write did to the in-memory catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteEffect {
    /// The live subscription will deliver the change.
    Deferred,
    /// The catalog was changed in place and persisted. A failed persist
    /// leaves a warning; the in-memory catalog stays authoritative.
    Applied { storage_warning: Option<String> },
    /// Nothing matched; the catalog is untouched.
    Unchanged,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn mode(&self) -> BackendMode;

    async fn create(&self, vehicle: NewVehicle) -> Result<(String, WriteEffect), AppError>;

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<WriteEffect, AppError>;

    async fn delete(&self, id: &str) -> Result<WriteEffect, AppError>;
}

/// Writes go to the hosted collection; the subscription reflects them.
pub struct CloudSource {
    store: Arc<dyn DocumentStore>,
}

impl CloudSource {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CatalogSource for CloudSource {
    fn mode(&self) -> BackendMode {
        BackendMode::Cloud
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<(String, WriteEffect), AppError> {
        let id = self.store.create(&vehicle).await?;
        Ok((id, WriteEffect::Deferred))
    }

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<WriteEffect, AppError> {
        self.store.update(id, patch).await?;
        Ok(WriteEffect::Deferred)
    }

    async fn delete(&self, id: &str) -> Result<WriteEffect, AppError> {
        self.store.delete(id).await?;
        Ok(WriteEffect::Deferred)
    }
}

/// Writes mutate the shared catalog and re-serialize it to local storage.
pub struct LocalSource {
    backend: LocalBackend,
    catalog: Arc<RwLock<Vec<VehicleRecord>>>,
}

impl LocalSource {
    pub fn new(backend: LocalBackend, catalog: Arc<RwLock<Vec<VehicleRecord>>>) -> Self {
        Self { backend, catalog }
    }

    async fn persist(&self, records: &[VehicleRecord]) -> WriteEffect {
        let storage_warning = match self.backend.save_all(records).await {
            Ok(()) => None,
            Err(AppError::QuotaExceeded(msg)) => Some(msg),
            Err(e) => {
                tracing::error!("Failed to save inventory to storage: {}", e);
                Some(e.message())
            }
        };
        WriteEffect::Applied { storage_warning }
    }
}

#[async_trait]
impl CatalogSource for LocalSource {
    fn mode(&self) -> BackendMode {
        BackendMode::Local
    }

    async fn create(&self, vehicle: NewVehicle) -> Result<(String, WriteEffect), AppError> {
        // The write lock is held through the save so blobs land in mutation order
        let mut catalog = self.catalog.write().await;
        let id = self.backend.generate_id();
        catalog.insert(0, VehicleRecord::with_id(id.clone(), vehicle));
        let effect = self.persist(&catalog).await;
        Ok((id, effect))
    }

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<WriteEffect, AppError> {
        let mut catalog = self.catalog.write().await;
        let record = catalog
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))?;
        record.apply(patch);
        Ok(self.persist(&catalog).await)
    }

    async fn delete(&self, id: &str) -> Result<WriteEffect, AppError> {
        let mut catalog = self.catalog.write().await;
        let before = catalog.len();
        catalog.retain(|r| r.id != id);
        if catalog.len() == before {
            return Ok(WriteEffect::Unchanged);
        }
        Ok(self.persist(&catalog).await)
    }
}
