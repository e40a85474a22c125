//! Service providers and the builder/hook descriptors they expose.

use std::fmt;
use std::sync::Arc;

use servicehost_core::ProviderCategory;

use crate::error::{HookResult, Result, ServiceError};
use crate::manager::Orchestrator;
use crate::service::{same_instance, Service};

type BuildFn = dyn Fn() -> std::result::Result<Arc<dyn Service>, ServiceError> + Send + Sync;
type InitHookFn = dyn Fn(&Arc<dyn Service>) -> HookResult + Send + Sync;

/// Zero-argument factory bound to a target service name.
pub struct BuilderBinding {
    target: String,
    build: Box<BuildFn>,
}

impl BuilderBinding {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn build(&self) -> std::result::Result<Arc<dyn Service>, ServiceError> {
        (self.build)()
    }
}

/// Callback fired once, right after the target service starts.
pub struct HookBinding {
    target: String,
    callback: Box<InitHookFn>,
}

impl HookBinding {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn invoke(&self, service: &Arc<dyn Service>) -> HookResult {
        (self.callback)(service)
    }
}

/// Builders and hooks declared by one provider for one start cycle.
#[derive(Default)]
pub struct ProviderBindings {
    builders: Vec<BuilderBinding>,
    hooks: Vec<HookBinding>,
}

impl ProviderBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a builder for `target`.
    ///
    /// The builder only runs when `target` was registered as expected during
    /// the registration phase, or when an earlier provider already built it.
    pub fn builder<F>(mut self, target: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> std::result::Result<Arc<dyn Service>, ServiceError> + Send + Sync + 'static,
    {
        self.builders.push(BuilderBinding {
            target: target.into(),
            build: Box::new(build),
        });
        self
    }

    /// Declare a hook that receives `target` once it has started.
    pub fn init_hook<F>(mut self, target: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Arc<dyn Service>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.push(HookBinding {
            target: target.into(),
            callback: Box::new(callback),
        });
        self
    }

    pub fn builders(&self) -> &[BuilderBinding] {
        &self.builders
    }

    pub fn hooks(&self) -> &[HookBinding] {
        &self.hooks
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty() && self.hooks.is_empty()
    }

    pub fn into_parts(self) -> (Vec<BuilderBinding>, Vec<HookBinding>) {
        (self.builders, self.hooks)
    }
}

impl fmt::Debug for ProviderBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBindings")
            .field(
                "builders",
                &self.builders.iter().map(|b| b.target()).collect::<Vec<_>>(),
            )
            .field(
                "hooks",
                &self.hooks.iter().map(|h| h.target()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Unscoped provider callbacks run across all providers at fixed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    PreInit,
    PostInit,
    PreStop,
}

impl LifecycleHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreInit => "pre_init",
            Self::PostInit => "post_init",
            Self::PreStop => "pre_stop",
        }
    }
}

/// A named contributor of services and lifecycle hooks.
///
/// Bindings are requested again on every start, so a provider may change
/// what it offers between cycles.
pub trait ServiceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> ProviderCategory;

    /// Called during registration; register the names this provider builds.
    fn register_new_services(&self, orchestrator: &Orchestrator) -> Result<()> {
        let _ = orchestrator;
        Ok(())
    }

    fn bindings(&self) -> ProviderBindings {
        ProviderBindings::new()
    }

    fn pre_init(&self) -> HookResult {
        Ok(())
    }

    fn post_init(&self) -> HookResult {
        Ok(())
    }

    fn pre_stop(&self) -> HookResult {
        Ok(())
    }
}

/// Dispatch a [`LifecycleHook`] to the matching provider callback.
pub(crate) fn run_lifecycle_hook(provider: &dyn ServiceProvider, hook: LifecycleHook) -> HookResult {
    match hook {
        LifecycleHook::PreInit => provider.pre_init(),
        LifecycleHook::PostInit => provider.post_init(),
        LifecycleHook::PreStop => provider.pre_stop(),
    }
}

/// A provider as seen by one discovery pass.
#[derive(Clone)]
pub struct ProviderEntry {
    pub provider: Arc<dyn ServiceProvider>,
    pub category: ProviderCategory,
}

/// Registered providers in registration order.
#[derive(Default)]
pub(crate) struct ProviderTable {
    providers: Vec<Arc<dyn ServiceProvider>>,
}

impl ProviderTable {
    /// Returns `false` when this exact provider instance is already present.
    pub fn register(&mut self, provider: Arc<dyn ServiceProvider>) -> bool {
        if self.providers.iter().any(|p| same_instance(p, &provider)) {
            return false;
        }
        self.providers.push(provider);
        true
    }

    /// Providers grouped core, platform, expansion; registration order within
    /// a category. Categories are read fresh on every call.
    pub fn in_category_order(&self) -> Vec<ProviderEntry> {
        let mut entries: Vec<ProviderEntry> = self
            .providers
            .iter()
            .map(|provider| ProviderEntry {
                category: provider.category(),
                provider: Arc::clone(provider),
            })
            .collect();
        entries.sort_by_key(|entry| entry.category);
        entries
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, ProviderCategory);

    impl ServiceProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn category(&self) -> ProviderCategory {
            self.1
        }

        fn pre_stop(&self) -> HookResult {
            Err(ServiceError::failed("refusing to stop"))
        }
    }

    #[test]
    fn test_table_deduplicates_by_identity() {
        let mut table = ProviderTable::default();
        let provider: Arc<dyn ServiceProvider> = Arc::new(Named("a", ProviderCategory::Core));

        assert!(table.register(Arc::clone(&provider)));
        assert!(!table.register(Arc::clone(&provider)));
        assert!(table.register(Arc::new(Named("a", ProviderCategory::Core))));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_category_order_is_stable() {
        let mut table = ProviderTable::default();
        table.register(Arc::new(Named("exp", ProviderCategory::Expansion)));
        table.register(Arc::new(Named("platform-1", ProviderCategory::Platform)));
        table.register(Arc::new(Named("core", ProviderCategory::Core)));
        table.register(Arc::new(Named("platform-2", ProviderCategory::Platform)));

        let names: Vec<_> = table
            .in_category_order()
            .iter()
            .map(|e| e.provider.name().to_string())
            .collect();
        assert_eq!(names, vec!["core", "platform-1", "platform-2", "exp"]);
    }

    #[test]
    fn test_bindings_builder_chain() {
        let bindings = ProviderBindings::new()
            .builder("config", || Err(ServiceError::failed("not today")))
            .init_hook("config", |_| Ok(()))
            .init_hook("scheduler", |_| Ok(()));

        assert_eq!(bindings.builders().len(), 1);
        assert_eq!(bindings.hooks().len(), 2);
        assert!(bindings.builders()[0].build().is_err());
        assert_eq!(
            format!("{:?}", bindings),
            "ProviderBindings { builders: [\"config\"], hooks: [\"config\", \"scheduler\"] }"
        );
        assert!(ProviderBindings::new().is_empty());
    }

    #[test]
    fn test_lifecycle_hook_dispatch() {
        let provider = Named("a", ProviderCategory::Platform);
        assert!(run_lifecycle_hook(&provider, LifecycleHook::PreInit).is_ok());
        assert!(run_lifecycle_hook(&provider, LifecycleHook::PostInit).is_ok());
        assert_eq!(
            run_lifecycle_hook(&provider, LifecycleHook::PreStop),
            Err(ServiceError::failed("refusing to stop"))
        );
        assert_eq!(LifecycleHook::PreStop.as_str(), "pre_stop");
    }
}
