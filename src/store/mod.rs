//! Persistence backends for the vehicle catalog.
//!
//! `local` keeps the whole catalog as one blob on this device; `cloud` is the
//! contract for the hosted document collection, implemented over REST by
//! `firestore`.

mod cloud;
mod firestore;
mod local;
#[cfg(test)]
pub mod memory;
mod seed;

pub use cloud::*;
pub use firestore::FirestoreStore;
pub use local::*;
pub use seed::starter_inventory;
