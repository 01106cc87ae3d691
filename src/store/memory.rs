//! In-memory document store for tests.
//!
//! Snapshot delivery is controllable: with auto-notify off, tests push
//! snapshots (including stale empty ones) by hand to model a slow network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::cloud::{DocumentStore, Subscription, SubscriptionEvent};
use crate::errors::AppError;
use crate::models::{NewVehicle, VehiclePatch, VehicleRecord};

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: Mutex<BTreeMap<String, VehicleRecord>>,
    subscribers: Mutex<Vec<mpsc::Sender<SubscriptionEvent>>>,
    next_id: AtomicUsize,
    manual_delivery: AtomicBool,
    fail_subscribe: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with records; their ids are kept.
    pub fn with_records(records: Vec<VehicleRecord>) -> Self {
        let store = Self::new();
        {
            let mut docs = store.docs.lock().unwrap();
            for record in records {
                docs.insert(record.id.clone(), record);
            }
        }
        store
    }

    /// Stop pushing snapshots after writes; tests deliver them explicitly.
    pub fn set_manual_delivery(&self, manual: bool) {
        self.manual_delivery.store(manual, Ordering::SeqCst);
    }

    /// Make the next `subscribe` fail outright.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    /// Number of subscribe/create/update/delete calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<VehicleRecord> {
        let mut records: Vec<VehicleRecord> = self.docs.lock().unwrap().values().cloned().collect();
        // Same ordering as the live query: newest year first
        records.sort_by(|a, b| b.year.cmp(&a.year));
        records
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Deliver an arbitrary event to every live subscriber.
    pub fn push(&self, event: SubscriptionEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            let _ = tx.try_send(event.clone());
        }
    }

    /// Deliver the current collection to every live subscriber.
    pub fn push_current(&self) {
        self.push(SubscriptionEvent::Snapshot(self.records()));
    }

    fn after_write(&self) {
        if !self.manual_delivery.load(Ordering::SeqCst) {
            self.push_current();
        }
    }

    async fn delay(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn subscribe(&self) -> Result<Subscription, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AppError::Cloud("permission denied".to_string()));
        }

        let (tx, subscription) = Subscription::channel();
        if !self.manual_delivery.load(Ordering::SeqCst) {
            let _ = tx.try_send(SubscriptionEvent::Snapshot(self.records()));
        }
        self.subscribers.lock().unwrap().push(tx);
        Ok(subscription)
    }

    async fn create(&self, vehicle: &NewVehicle) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let id = format!("cloud-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.docs
            .lock()
            .unwrap()
            .insert(id.clone(), VehicleRecord::with_id(id.clone(), vehicle.clone()));
        self.after_write();
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        {
            let mut docs = self.docs.lock().unwrap();
            let record = docs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))?;
            record.apply(patch);
        }
        self.after_write();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        self.docs.lock().unwrap().remove(id);
        self.after_write();
        Ok(())
    }
}
