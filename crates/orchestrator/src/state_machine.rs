use servicehost_core::{CoreError, Phase};

pub struct PhaseStateMachine;

impl PhaseStateMachine {
    pub fn validate_transition(from: &Phase, to: &Phase) -> Result<(), CoreError> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(CoreError::InvalidPhaseTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// `Registering -> Stopped` is the abort edge taken when an expansion
    /// fails to initialize.
    fn allowed_transitions(from: &Phase) -> Vec<Phase> {
        match from {
            Phase::Stopped => vec![Phase::Registering],
            Phase::Registering => vec![Phase::Building, Phase::Stopped],
            Phase::Building => vec![Phase::Initializing],
            Phase::Initializing => vec![Phase::Running],
            Phase::Running => vec![Phase::Stopping],
            Phase::Stopping => vec![Phase::Stopped],
        }
    }

    pub fn can_transition(from: &Phase, to: &Phase) -> bool {
        Self::validate_transition(from, to).is_ok()
    }

    pub fn next_phase(current: &Phase) -> Phase {
        match current {
            Phase::Stopped => Phase::Registering,
            Phase::Registering => Phase::Building,
            Phase::Building => Phase::Initializing,
            Phase::Initializing => Phase::Running,
            Phase::Running => Phase::Stopping,
            Phase::Stopping => Phase::Stopped,
        }
    }
}
