use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use servicehost_core::ProviderCategory;

use crate::error::Result;
use crate::manager::Orchestrator;
use crate::provider::{ProviderBindings, ServiceProvider};
use crate::service::Service;
use crate::services::{ConfigurationService, CONFIG_SERVICE};

/// Provider installed by the orchestrator on every start.
///
/// Registers and builds the `config` service, seeded from the host
/// configuration's `settings` table.
pub struct CoreServiceProvider {
    settings: BTreeMap<String, Value>,
}

impl CoreServiceProvider {
    pub fn new(settings: BTreeMap<String, Value>) -> Self {
        Self { settings }
    }
}

impl Default for CoreServiceProvider {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl ServiceProvider for CoreServiceProvider {
    fn name(&self) -> &str {
        "core"
    }

    fn category(&self) -> ProviderCategory {
        ProviderCategory::Core
    }

    fn register_new_services(&self, orchestrator: &Orchestrator) -> Result<()> {
        orchestrator.register_service(CONFIG_SERVICE)
    }

    fn bindings(&self) -> ProviderBindings {
        let settings = self.settings.clone();
        ProviderBindings::new().builder(CONFIG_SERVICE, move || {
            let service: Arc<dyn Service> =
                Arc::new(ConfigurationService::with_values(settings.clone()));
            Ok(service)
        })
    }
}
