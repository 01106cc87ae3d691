//! Inventory synchronization service.
//!
//! Owns the in-memory catalog and decides which backend serves it. In cloud
//! mode the catalog follows a live subscription and an empty collection is
//! seeded once with the starter inventory. Any subscription failure switches
//! the service to local storage for the rest of the process lifetime.

mod source;

pub use source::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};

use crate::errors::AppError;
use crate::models::{BackendMode, NewVehicle, SyncStatus, VehiclePatch, VehicleRecord};
use crate::store::{
    starter_inventory, DocumentStore, LocalBackend, Subscription, SubscriptionEvent,
};

pub struct InventorySync {
    local: LocalBackend,
    catalog: Arc<RwLock<Vec<VehicleRecord>>>,
    source: RwLock<Arc<dyn CatalogSource>>,
    status: watch::Sender<SyncStatus>,
    /// Set by the first snapshot, empty or not; never cleared
    first_snapshot_seen: AtomicBool,
    /// True while starter writes are in flight
    seeding: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
    seeder: Mutex<Option<JoinHandle<()>>>,
}

impl InventorySync {
    fn new(
        local: LocalBackend,
        catalog: Arc<RwLock<Vec<VehicleRecord>>>,
        source: Arc<dyn CatalogSource>,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::initializing(source.mode()));
        Self {
            local,
            catalog,
            source: RwLock::new(source),
            status,
            first_snapshot_seen: AtomicBool::new(false),
            seeding: AtomicBool::new(false),
            listener: Mutex::new(None),
            seeder: Mutex::new(None),
        }
    }

    /// Start the service.
    ///
    /// With a cloud store the service subscribes and returns immediately while
    /// the catalog is still loading. Without one the local catalog is loaded
    /// before returning.
    pub async fn start(local: LocalBackend, cloud: Option<Arc<dyn DocumentStore>>) -> Arc<Self> {
        let catalog = Arc::new(RwLock::new(Vec::new()));

        let Some(store) = cloud else {
            tracing::info!("No cloud store configured, serving inventory from local storage");
            let source = Arc::new(LocalSource::new(local.clone(), Arc::clone(&catalog)));
            let sync = Arc::new(Self::new(local, catalog, source));
            sync.load_local().await;
            return sync;
        };

        let source = Arc::new(CloudSource::new(Arc::clone(&store)));
        let sync = Arc::new(Self::new(local, catalog, source));

        match store.subscribe() {
            Ok(subscription) => {
                tracing::info!("Subscribed to cloud inventory");
                let handle = tokio::spawn(Arc::clone(&sync).listen(store, subscription));
                if let Ok(mut listener) = sync.listener.lock() {
                    *listener = Some(handle);
                }
            }
            Err(e) => {
                tracing::warn!("Cloud subscription failed, falling back to local storage: {}", e);
                sync.fall_back_to_local().await;
            }
        }

        sync
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn mode(&self) -> BackendMode {
        self.status.borrow().mode
    }

    pub fn revision_id(&self) -> i64 {
        self.status.borrow().revision_id
    }

    /// Resolve once the first catalog has been installed.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.status.subscribe();
        let _ = rx.wait_for(|status| !status.is_loading).await;
    }

    /// The catalog as currently installed.
    pub async fn catalog(&self) -> Vec<VehicleRecord> {
        self.catalog.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<VehicleRecord> {
        self.catalog.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Add a vehicle and return its id.
    ///
    /// Locally the record is prepended at once. In cloud mode it appears when
    /// the subscription delivers the next snapshot.
    pub async fn create(&self, vehicle: NewVehicle) -> Result<String, AppError> {
        let source = self.active_source().await;
        let (id, effect) = source.create(vehicle).await?;
        tracing::info!(id = %id, mode = source.mode().as_str(), "Vehicle created");
        self.apply_effect(effect).await;
        Ok(id)
    }

    /// Merge the supplied fields into an existing vehicle.
    pub async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<(), AppError> {
        let source = self.active_source().await;
        let effect = source.update(id, patch).await?;
        tracing::info!(id = %id, fields = ?patch.field_paths(), "Vehicle updated");
        self.apply_effect(effect).await;
        Ok(())
    }

    /// Remove a vehicle. Removing an unknown id succeeds without a change.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let source = self.active_source().await;
        let effect = source.delete(id).await?;
        tracing::info!(id = %id, "Vehicle deleted");
        self.apply_effect(effect).await;
        Ok(())
    }

    /// Cancel the live subscription and any starter writes still running.
    pub fn shutdown(&self) {
        if let Some(handle) = take_handle(&self.listener) {
            tracing::info!("Cancelling cloud subscription");
            handle.abort();
        }
        if let Some(handle) = take_handle(&self.seeder) {
            if !handle.is_finished() {
                tracing::info!("Cancelling starter inventory writes");
            }
            handle.abort();
        }
    }

    async fn active_source(&self) -> Arc<dyn CatalogSource> {
        Arc::clone(&*self.source.read().await)
    }

    async fn listen(self: Arc<Self>, store: Arc<dyn DocumentStore>, mut subscription: Subscription) {
        while let Some(event) = subscription.next().await {
            match event {
                SubscriptionEvent::Snapshot(records) => self.on_snapshot(&store, records).await,
                SubscriptionEvent::Error(e) => {
                    tracing::warn!(
                        "Cloud subscription failed, falling back to local storage: {}",
                        e
                    );
                    subscription.cancel();
                    self.fall_back_to_local().await;
                    return;
                }
            }
        }
        tracing::debug!("Cloud subscription ended");
    }

    async fn on_snapshot(self: &Arc<Self>, store: &Arc<dyn DocumentStore>, records: Vec<VehicleRecord>) {
        let first = !self.first_snapshot_seen.swap(true, Ordering::SeqCst);
        if records.is_empty() {
            // Only an empty first snapshot seeds; later ones mean the collection was emptied
            if first {
                self.seed(Arc::clone(store));
                return;
            }
            if self.seeding.load(Ordering::SeqCst) {
                tracing::debug!("Ignoring empty snapshot while starter inventory is being written");
                return;
            }
        }

        tracing::debug!(count = records.len(), "Installing cloud snapshot");
        *self.catalog.write().await = records;
        self.publish(None).await;
    }

    /// Write the starter inventory without waiting for the writes to come
    /// back through the subscription.
    fn seed(self: &Arc<Self>, store: Arc<dyn DocumentStore>) {
        tracing::info!("Cloud inventory is empty, seeding starter inventory");
        self.seeding.store(true, Ordering::SeqCst);

        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let starter = starter_inventory();
            let total = starter.len();
            // Dropping the set aborts the writes, so cancelling this task cancels them too
            let mut writes = JoinSet::new();
            for record in starter {
                let store = Arc::clone(&store);
                writes.spawn(async move { store.create(&record.to_new()).await });
            }

            let mut failed = 0;
            while let Some(write) = writes.join_next().await {
                match write {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        failed += 1;
                        tracing::warn!("Failed to seed starter vehicle: {}", e);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::warn!("Seed task did not complete: {}", e);
                    }
                }
            }
            sync.seeding.store(false, Ordering::SeqCst);

            if failed == total {
                tracing::error!("Seeding failed; serving an empty cloud inventory");
                let status = sync.status();
                if status.is_loading && status.mode == BackendMode::Cloud {
                    sync.catalog.write().await.clear();
                    sync.publish(None).await;
                }
            } else {
                tracing::info!(seeded = total - failed, "Starter inventory written");
            }
        });

        if let Ok(mut seeder) = self.seeder.lock() {
            *seeder = Some(handle);
        }
    }

    async fn fall_back_to_local(&self) {
        let source: Arc<dyn CatalogSource> =
            Arc::new(LocalSource::new(self.local.clone(), Arc::clone(&self.catalog)));
        *self.source.write().await = source;
        self.status.send_modify(|status| status.mode = BackendMode::Local);
        self.load_local().await;
    }

    async fn load_local(&self) {
        let records = self.local.load_all().await;
        tracing::info!(count = records.len(), "Loaded local inventory");
        *self.catalog.write().await = records;
        self.publish(None).await;
    }

    async fn apply_effect(&self, effect: WriteEffect) {
        if let WriteEffect::Applied { storage_warning } = effect {
            if let Some(warning) = &storage_warning {
                tracing::warn!("{}", warning);
            }
            self.publish(Some(storage_warning)).await;
        }
    }

    /// Announce a new catalog revision. `storage_warning` replaces the
    /// current warning when supplied.
    async fn publish(&self, storage_warning: Option<Option<String>>) {
        let count = self.catalog.read().await.len();
        self.status.send_modify(|status| {
            status.is_loading = false;
            status.revision_id += 1;
            status.count = count;
            if let Some(warning) = storage_warning {
                status.storage_warning = warning;
            }
        });
    }
}

fn take_handle(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
    slot.lock().ok().and_then(|mut handle| handle.take())
}
