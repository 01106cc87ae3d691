//! Cloud persistence contract.
//!
//! A hosted document collection keyed by vehicle id with a live, full-set
//! subscription ordered by year descending.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::models::{NewVehicle, VehiclePatch, VehicleRecord};

/// Buffer for undelivered subscription events.
pub const SUBSCRIPTION_BUFFER: usize = 16;

/// One notification from a live subscription.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// The complete current collection, not a diff.
    Snapshot(Vec<VehicleRecord>),
    /// Connection or permission failure. No further events follow.
    Error(AppError),
}

/// Live subscription to the vehicle collection.
///
/// The producer stops as soon as the subscription is cancelled or dropped.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<SubscriptionEvent>,
}

impl Subscription {
    /// Create a subscription and the sender its producer feeds.
    pub fn channel() -> (mpsc::Sender<SubscriptionEvent>, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (tx, Self { events: rx })
    }

    /// Wait for the next event. `None` once the producer has finished.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Stop receiving updates and release the connection.
    pub fn cancel(mut self) {
        self.events.close();
    }
}

/// Hosted document store holding the catalog.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription ordered by `year` descending.
    fn subscribe(&self) -> Result<Subscription, AppError>;

    /// Insert a vehicle and return the server-assigned id.
    async fn create(&self, vehicle: &NewVehicle) -> Result<String, AppError>;

    /// Merge the supplied fields into an existing document.
    /// Fails with `NotFound` when the id does not exist.
    async fn update(&self, id: &str, patch: &VehiclePatch) -> Result<(), AppError>;

    /// Remove a document. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_closes_producer_side() {
        let (tx, subscription) = Subscription::channel();
        assert!(!tx.is_closed());

        subscription.cancel();
        assert!(tx.is_closed());
        assert!(tx
            .send(SubscriptionEvent::Snapshot(Vec::new()))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_next_ends_when_producer_drops() {
        let (tx, mut subscription) = Subscription::channel();
        tx.send(SubscriptionEvent::Snapshot(Vec::new())).await.unwrap();
        drop(tx);

        assert!(matches!(
            subscription.next().await,
            Some(SubscriptionEvent::Snapshot(_))
        ));
        assert!(subscription.next().await.is_none());
    }
}
