use std::sync::Arc;

use crate::error::ServiceError;
use crate::manager::Orchestrator;
use crate::service::same_instance;

/// Setup unit run once per start cycle, before provider discovery.
///
/// An expansion typically registers further providers. A failure aborts
/// the start cycle and is returned to the caller of
/// [`Orchestrator::start`].
pub trait Expansion: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self, orchestrator: &Orchestrator) -> Result<(), ServiceError>;
}

#[derive(Default)]
pub(crate) struct ExpansionList {
    expansions: Vec<Arc<dyn Expansion>>,
}

impl ExpansionList {
    /// Returns `false` when this exact expansion instance is already present.
    pub fn register(&mut self, expansion: Arc<dyn Expansion>) -> bool {
        if self.expansions.iter().any(|e| same_instance(e, &expansion)) {
            return false;
        }
        self.expansions.push(expansion);
        true
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn Expansion>> {
        self.expansions.clone()
    }
}
