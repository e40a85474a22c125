//! Event types for the service host event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use servicehost_core::Phase;
use std::fmt;
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Step of a service's lifecycle that failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Build,
    Start,
    Stop,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Orchestrator events
    /// Orchestrator moved to a new phase
    #[serde(rename = "phase.changed")]
    PhaseChanged { from: Phase, to: Phase },

    /// Cycle finished with expected services that were never built
    #[serde(rename = "services.unbuilt")]
    UnbuiltServices { names: Vec<String> },

    // Service events
    /// A builder produced a service instance
    #[serde(rename = "service.built")]
    ServiceBuilt { name: String, provider: String },

    /// Service start returned successfully
    #[serde(rename = "service.started")]
    ServiceStarted { name: String, priority: i32 },

    /// Service was stopped and moved back to pending
    #[serde(rename = "service.stopped")]
    ServiceStopped { name: String },

    /// Building, starting or stopping a service failed
    #[serde(rename = "service.failed")]
    ServiceFailed {
        name: String,
        stage: FailureStage,
        reason: String,
    },

    // Hook events
    /// A provider hook returned an error
    #[serde(rename = "hook.failed")]
    HookFailed {
        provider: String,
        target: String,
        reason: String,
    },
}

impl Event {
    /// Get the service name associated with this event, if any
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Event::ServiceBuilt { name, .. } => Some(name),
            Event::ServiceStarted { name, .. } => Some(name),
            Event::ServiceStopped { name } => Some(name),
            Event::ServiceFailed { name, .. } => Some(name),
            Event::PhaseChanged { .. } => None,
            Event::UnbuiltServices { .. } => None,
            Event::HookFailed { .. } => None,
        }
    }

    /// Dotted event type name, as used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PhaseChanged { .. } => "phase.changed",
            Event::UnbuiltServices { .. } => "services.unbuilt",
            Event::ServiceBuilt { .. } => "service.built",
            Event::ServiceStarted { .. } => "service.started",
            Event::ServiceStopped { .. } => "service.stopped",
            Event::ServiceFailed { .. } => "service.failed",
            Event::HookFailed { .. } => "hook.failed",
        }
    }
}
