//! Shared domain types for the service host.
//!
//! These types are used by the orchestrator, the event system and the
//! command line binary alike, so they live in a crate with no runtime
//! dependencies of its own.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::CoreError;
