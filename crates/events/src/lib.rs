//! Lifecycle event system for the service host
//!
//! This crate provides the event bus and event types the orchestrator
//! publishes while it builds, starts and stops services.

mod bus;
mod types;

pub use bus::{EventBus, DEFAULT_CAPACITY};
pub use types::*;
