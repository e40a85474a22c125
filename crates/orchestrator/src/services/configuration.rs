use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use servicehost_core::ServicePriority;

use crate::error::ServiceError;
use crate::service::{Service, ServiceState};

/// Registry name of the configuration service.
pub const CONFIG_SERVICE: &str = "config";

/// Key/value store for runtime configuration.
///
/// Starts with the seed values it was built with; values set at runtime
/// are discarded on stop.
pub struct ConfigurationService {
    state: ServiceState,
    seed: BTreeMap<String, Value>,
    values: RwLock<BTreeMap<String, Value>>,
}

impl ConfigurationService {
    pub fn new() -> Self {
        Self::with_values(BTreeMap::new())
    }

    pub fn with_values(seed: BTreeMap<String, Value>) -> Self {
        Self {
            state: ServiceState::new(),
            seed,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        self.state.check(CONFIG_SERVICE)?;
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    /// Typed lookup; a value of the wrong shape is an error, a missing key is `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        match self.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ServiceError::failed(format!("Invalid value for {}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<Option<Value>, ServiceError> {
        self.state.check(CONFIG_SERVICE)?;
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        Ok(values.insert(key.into(), value))
    }

    pub fn keys(&self) -> Result<Vec<String>, ServiceError> {
        self.state.check(CONFIG_SERVICE)?;
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.keys().cloned().collect())
    }
}

impl Default for ConfigurationService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for ConfigurationService {
    fn name(&self) -> &str {
        CONFIG_SERVICE
    }

    fn priority(&self) -> i32 {
        ServicePriority::CONFIGURATION
    }

    fn start(&self) -> Result<(), ServiceError> {
        if self.state.mark_started() {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            *values = self.seed.clone();
            info!(keys = values.len(), "Initialized configuration service");
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        if self.state.mark_stopped() {
            self.values
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            info!("Stopped configuration service");
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state.is_started()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
