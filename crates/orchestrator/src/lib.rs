//! Service lifecycle orchestration.
//!
//! Providers register the services they can build, the [`Orchestrator`]
//! builds only what was asked for, starts everything in priority order and
//! stops it again in exact reverse.

pub mod config;
pub mod core_provider;
pub mod error;
pub mod expansion;
mod hooks;
pub mod manager;
pub mod provider;
pub mod registry;
pub mod service;
pub mod services;
pub mod state_machine;

pub use config::{EventsConfig, HostConfig, LoggingConfig, DEFAULT_CONFIG_FILE};
pub use core_provider::CoreServiceProvider;
pub use error::{HookResult, OrchestratorError, Result, ServiceError};
pub use expansion::Expansion;
pub use manager::Orchestrator;
pub use provider::{BuilderBinding, HookBinding, LifecycleHook, ProviderBindings, ServiceProvider};
pub use service::{same_instance, Service, ServiceState};
pub use state_machine::PhaseStateMachine;
