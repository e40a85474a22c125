use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Lifecycle phase of the orchestrator.
///
/// Exactly one phase is current at any time. A run cycle walks the variants
/// in declaration order and returns to `Stopped` once shutdown completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Stopped,
    Registering,
    Building,
    Initializing,
    Running,
    Stopping,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Stopped,
        Phase::Registering,
        Phase::Building,
        Phase::Initializing,
        Phase::Running,
        Phase::Stopping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Registering => "registering",
            Self::Building => "building",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(Self::Stopped),
            "registering" => Some(Self::Registering),
            "building" => Some(Self::Building),
            "initializing" => Some(Self::Initializing),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownPhase(s.to_string()))
    }
}
