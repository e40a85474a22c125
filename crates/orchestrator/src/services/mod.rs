//! Services shipped with the orchestrator itself.

mod configuration;

pub use configuration::{ConfigurationService, CONFIG_SERVICE};
