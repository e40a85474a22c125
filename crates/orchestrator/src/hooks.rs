use std::collections::HashMap;

use crate::provider::HookBinding;

pub(crate) struct RegisteredHook {
    pub provider: String,
    pub binding: HookBinding,
}

/// Per-service init hooks for the current start cycle, in registration order.
#[derive(Default)]
pub(crate) struct HookRegistry {
    hooks: HashMap<String, Vec<RegisteredHook>>,
}

impl HookRegistry {
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn add(&mut self, provider: &str, binding: HookBinding) {
        self.hooks
            .entry(binding.target().to_string())
            .or_default()
            .push(RegisteredHook {
                provider: provider.to_string(),
                binding,
            });
    }

    /// Remove and return the hooks bound to `service`.
    pub fn take(&mut self, service: &str) -> Vec<RegisteredHook> {
        self.hooks.remove(service).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }
}
