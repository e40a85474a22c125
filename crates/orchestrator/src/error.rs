use servicehost_core::{CoreError, Phase};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Cannot {operation} while the orchestrator is {phase}")]
    IllegalLifecycleState {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Failed to build {service} from provider {provider}: {reason}")]
    BuilderFailure {
        provider: String,
        service: String,
        reason: String,
    },

    #[error("Hook {target} from provider {provider} failed: {reason}")]
    HookFailure {
        provider: String,
        target: String,
        reason: String,
    },

    #[error("Service {service} failed to start: {reason}")]
    ServiceStartFailure { service: String, reason: String },

    #[error("Service {service} failed to stop: {reason}")]
    ServiceStopFailure { service: String, reason: String },

    #[error("Expansion {expansion} failed to initialize: {reason}")]
    ExpansionFailure { expansion: String, reason: String },

    #[error("Service not registered: {0}")]
    ServiceNotRegistered(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrchestratorError {
    pub fn illegal_state(operation: &'static str, phase: Phase) -> Self {
        Self::IllegalLifecycleState { operation, phase }
    }

    pub fn builder_failed(
        provider: impl Into<String>,
        service: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::BuilderFailure {
            provider: provider.into(),
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn hook_failed(
        provider: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::HookFailure {
            provider: provider.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from calling an operation in the wrong phase.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalLifecycleState { .. })
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Error reported by a service, builder, hook or expansion.
///
/// The orchestrator wraps these into an [`OrchestratorError`] naming the
/// provider or service that failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Failed(String),

    #[error("Service {0} is not started")]
    NotStarted(String),
}

impl ServiceError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

/// Result of a lifecycle or per-service hook.
pub type HookResult = std::result::Result<(), ServiceError>;
