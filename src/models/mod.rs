//! Data models for the Carz-34 inventory.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod sync;
mod vehicle;

pub use sync::*;
pub use vehicle::*;
